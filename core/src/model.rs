use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub path: PathBuf,
}

impl Project {
    pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
        }
    }
}

/// Half-open character range `[start, end)` within one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct Match {
    pub start: usize,
    pub end: usize,
}

impl Match {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<(usize, usize)> for Match {
    fn from((start, end): (usize, usize)) -> Self {
        Self { start, end }
    }
}

impl From<Match> for (usize, usize) {
    fn from(m: Match) -> Self {
        (m.start, m.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    #[serde(rename = "full")]
    pub text: String,
    #[serde(default)]
    pub matches: Vec<Match>,
}

impl Line {
    pub fn new(text: impl Into<String>, matches: Vec<Match>) -> Self {
        Self {
            text: text.into(),
            matches,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    pub path: String,
    #[serde(default)]
    pub extension: String,
}

impl FileRef {
    pub fn new(path: &str) -> Self {
        let extension = Path::new(path)
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path: path.to_string(),
            extension,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub file: FileRef,
    pub line_number: usize,
    pub lines: Vec<Line>,
    pub hash: u64,
}

impl Snippet {
    pub fn new(file: FileRef, line_number: usize, lines: Vec<Line>) -> Self {
        let hash = snippet_hash(&file, line_number, &lines);
        Self {
            file,
            line_number,
            lines,
            hash,
        }
    }

    pub fn match_count(&self) -> usize {
        self.lines.iter().map(|line| line.matches.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnippets {
    pub file: FileRef,
    pub snippets: Vec<Snippet>,
    pub match_count: usize,
    #[serde(default)]
    pub truncated: bool,
}

impl FileSnippets {
    pub fn new(file: FileRef, mut snippets: Vec<Snippet>) -> Self {
        let match_count = snippets.iter().map(Snippet::match_count).sum();
        snippets.sort_by_key(|snippet| snippet.line_number);
        Self {
            file,
            snippets,
            match_count,
            truncated: false,
        }
    }

    /// Same file and count, without the snippet bodies.
    pub fn truncate(&self) -> Self {
        Self {
            file: self.file.clone(),
            snippets: Vec::new(),
            match_count: self.match_count,
            truncated: true,
        }
    }
}

/// Raw result of one search fetch. Order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchResult {
    pub snippets: Vec<Snippet>,
}

impl SearchResult {
    pub fn new(snippets: Vec<Snippet>) -> Self {
        Self { snippets }
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }
}

impl From<Vec<Snippet>> for SearchResult {
    fn from(snippets: Vec<Snippet>) -> Self {
        Self { snippets }
    }
}

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001b3;

fn fnv1a(mut hash: u64, bytes: &[u8]) -> u64 {
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// FNV-1a over the snippet's identity. Stable across processes, unlike the
/// std `DefaultHasher`.
fn snippet_hash(file: &FileRef, line_number: usize, lines: &[Line]) -> u64 {
    let mut hash = fnv1a(FNV_OFFSET, file.path.as_bytes());
    hash = fnv1a(hash, &(line_number as u64).to_le_bytes());
    for line in lines {
        hash = fnv1a(hash, line.text.as_bytes());
        hash = fnv1a(hash, b"\n");
    }
    hash
}
