use std::collections::BTreeMap;

use crate::model::{FileRef, SearchResult, Snippet};

/// All snippets of one file, ordered by starting line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGroup {
    pub file: FileRef,
    pub snippets: Vec<Snippet>,
}

impl FileGroup {
    pub fn match_count(&self) -> usize {
        self.snippets.iter().map(Snippet::match_count).sum()
    }
}

/// Search result partitioned by file path, paths in ascending byte order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedResult {
    groups: Vec<FileGroup>,
}

impl GroupedResult {
    pub fn groups(&self) -> &[FileGroup] {
        &self.groups
    }

    pub fn file_count(&self) -> usize {
        self.groups.len()
    }

    pub fn snippet_count(&self) -> usize {
        self.groups.iter().map(|g| g.snippets.len()).sum()
    }

    pub fn match_count(&self) -> usize {
        self.groups.iter().map(FileGroup::match_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&FileGroup> {
        self.groups
            .binary_search_by(|g| g.file.path.as_str().cmp(path))
            .ok()
            .map(|idx| &self.groups[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileGroup> {
        self.groups.iter()
    }
}

/// Partition a flat search result into per-file groups.
///
/// Groups are ordered by path (case-sensitive, byte-wise), snippets inside a
/// group by starting line. Snippets that start on the same line keep their
/// relative order from the input, so the output is fully determined by it.
pub fn group(result: SearchResult) -> GroupedResult {
    let mut by_path: BTreeMap<String, Vec<Snippet>> = BTreeMap::new();
    for snippet in result.snippets {
        by_path
            .entry(snippet.file.path.clone())
            .or_default()
            .push(snippet);
    }

    let groups = by_path
        .into_values()
        .map(|mut snippets| {
            // sort_by_key is stable
            snippets.sort_by_key(|s| s.line_number);
            FileGroup {
                file: snippets[0].file.clone(),
                snippets,
            }
        })
        .collect();

    GroupedResult { groups }
}
