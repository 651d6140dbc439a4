use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::FileSnippets;
use crate::sequencer::{RequestClass, Sequencer, Ticket};

/// One tab of the pinned-file viewer. `content` stays empty until the first
/// fetch for the path lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedFile {
    pub path: String,
    pub content: Option<Arc<FileSnippets>>,
}

/// Presentation view of the pinned set: tabs in insertion order plus the
/// active one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinnedSnapshot {
    pub files: Vec<PinnedFile>,
    pub selected: Option<String>,
}

impl PinnedSnapshot {
    pub fn selected_file(&self) -> Option<&PinnedFile> {
        let selected = self.selected.as_deref()?;
        self.files.iter().find(|f| f.path == selected)
    }
}

/// Files kept open by the user, in insertion order, with one active tab.
///
/// Fetches for pinned paths are sequenced per path; this type hands out the
/// tickets and applies completions, the caller performs the I/O.
#[derive(Debug, Default)]
pub struct PinnedFiles {
    files: IndexMap<String, Option<Arc<FileSnippets>>>,
    selected: Option<String>,
    observed: HashSet<String>,
    sequencer: Sequencer,
}

impl PinnedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `path` (appended if absent) and return a ticket for fetching it,
    /// unless a fetch for that path is already in flight.
    pub fn add(&mut self, path: &str) -> Option<Ticket> {
        if !self.files.contains_key(path) {
            self.files.insert(path.to_string(), None);
            self.observe();
        }

        let class = RequestClass::File(path.to_string());
        if self.sequencer.is_pending(&class) {
            return None;
        }
        Some(self.sequencer.issue(class))
    }

    /// One fresh ticket per pinned path, in tab order. Supersedes anything
    /// still in flight for those paths.
    pub fn refresh_all(&mut self) -> Vec<Ticket> {
        let paths: Vec<String> = self.files.keys().cloned().collect();
        paths
            .into_iter()
            .map(|path| self.sequencer.issue(RequestClass::File(path)))
            .collect()
    }

    /// Apply a fetch completion. Returns `false` when it was stale or the path
    /// has been closed meanwhile.
    pub fn complete(&mut self, ticket: &Ticket, content: FileSnippets) -> bool {
        let RequestClass::File(path) = &ticket.class else {
            return false;
        };
        if !self.sequencer.admit(ticket) {
            return false;
        }
        let Some(slot) = self.files.get_mut(path) else {
            self.sequencer.forget(&ticket.class);
            return false;
        };
        *slot = Some(Arc::new(content));
        self.observe();
        true
    }

    pub fn fail(&mut self, ticket: &Ticket) {
        self.sequencer.abandon(ticket);
        if let Some(path) = ticket.path()
            && !self.files.contains_key(path)
        {
            self.sequencer.forget(&ticket.class);
        }
    }

    /// Unpin `path`. Its counters go with it, unless a fetch is still in
    /// flight; then they are dropped when that fetch settles.
    pub fn close(&mut self, path: &str) -> bool {
        if self.files.shift_remove(path).is_none() {
            return false;
        }
        self.sequencer.forget(&RequestClass::File(path.to_string()));
        self.observe();
        true
    }

    pub fn select(&mut self, path: &str) -> bool {
        if !self.files.contains_key(path) {
            return false;
        }
        self.selected = Some(path.to_string());
        true
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.selected = None;
        self.observed.clear();
        self.sequencer.reset();
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn content(&self, path: &str) -> Option<&Arc<FileSnippets>> {
        self.files.get(path).and_then(Option::as_ref)
    }

    pub fn is_pending(&self, path: &str) -> bool {
        self.sequencer
            .is_pending(&RequestClass::File(path.to_string()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn snapshot(&self) -> PinnedSnapshot {
        PinnedSnapshot {
            files: self
                .files
                .iter()
                .map(|(path, content)| PinnedFile {
                    path: path.clone(),
                    content: content.clone(),
                })
                .collect(),
            selected: self.selected.clone(),
        }
    }

    // Selection jumps to the newest tab when the set was empty, when a path
    // shows up that was not observed last time, or when the selected tab is
    // gone. Content refreshes change no keys and so never move it.
    fn observe(&mut self) {
        let Some(last) = self.files.keys().last().cloned() else {
            self.selected = None;
            self.observed.clear();
            return;
        };

        let selection_gone = self
            .selected
            .as_ref()
            .is_none_or(|selected| !self.files.contains_key(selected));
        let new_arrival = self.files.keys().any(|path| !self.observed.contains(path));
        if selection_gone || new_arrival {
            self.selected = Some(last);
        }

        self.observed = self.files.keys().cloned().collect();
    }
}
