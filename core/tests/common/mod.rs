//! Scripted backend for session tests.
//!
//! Every search and file fetch parks until the test replies to it, so tests
//! decide the order in which completions arrive.

#![allow(dead_code)] // Not every test module uses every helper

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use codesearch_core::{
    Backend, BackendError, FileRef, FileRequest, FileSnippets, Line, Match, MemoryProjectStore,
    Project, RecordingSink, SearchRequest, SearchResult, Session, Snippet,
};
use tokio::sync::oneshot;

type Reply<T> = oneshot::Sender<Result<T, BackendError>>;

struct Parked<R, T> {
    project: String,
    request: R,
    reply: Option<Reply<T>>,
}

pub struct ScriptedBackend {
    projects: Vec<Project>,
    searches: Mutex<Vec<Parked<SearchRequest, SearchResult>>>,
    files: Mutex<Vec<Parked<FileRequest, FileSnippets>>>,
}

impl ScriptedBackend {
    pub fn new(projects: Vec<Project>) -> Arc<Self> {
        Arc::new(Self {
            projects,
            searches: Mutex::new(Vec::new()),
            files: Mutex::new(Vec::new()),
        })
    }

    pub fn search_count(&self) -> usize {
        self.searches.lock().unwrap().len()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn search_request(&self, idx: usize) -> (String, SearchRequest) {
        let searches = self.searches.lock().unwrap();
        (searches[idx].project.clone(), searches[idx].request.clone())
    }

    pub fn file_request(&self, idx: usize) -> (String, FileRequest) {
        let files = self.files.lock().unwrap();
        (files[idx].project.clone(), files[idx].request.clone())
    }

    pub fn reply_search(&self, idx: usize, result: Result<SearchResult, BackendError>) {
        let reply = self.searches.lock().unwrap()[idx]
            .reply
            .take()
            .expect("search already answered");
        reply.send(result).expect("search task is gone");
    }

    pub fn reply_file(&self, idx: usize, result: Result<FileSnippets, BackendError>) {
        let reply = self.files.lock().unwrap()[idx]
            .reply
            .take()
            .expect("file fetch already answered");
        reply.send(result).expect("file task is gone");
    }

    /// Yield until the spawned fetch tasks have parked `searches` searches and
    /// `files` file fetches in total.
    pub async fn settle(&self, searches: usize, files: usize) {
        for _ in 0..1000 {
            if self.search_count() >= searches && self.file_count() >= files {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!(
            "expected {searches} searches and {files} file fetches, saw {} and {}",
            self.search_count(),
            self.file_count()
        );
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn list_projects(&self) -> Result<Vec<Project>, BackendError> {
        Ok(self.projects.clone())
    }

    async fn search_project(
        &self,
        project: &Project,
        request: &SearchRequest,
    ) -> Result<SearchResult, BackendError> {
        let (tx, rx) = oneshot::channel();
        self.searches.lock().unwrap().push(Parked {
            project: project.name.clone(),
            request: request.clone(),
            reply: Some(tx),
        });
        rx.await
            .unwrap_or_else(|_| Err(BackendError::Transport("reply dropped".into())))
    }

    async fn fetch_file(
        &self,
        project: &Project,
        request: &FileRequest,
    ) -> Result<FileSnippets, BackendError> {
        let (tx, rx) = oneshot::channel();
        self.files.lock().unwrap().push(Parked {
            project: project.name.clone(),
            request: request.clone(),
            reply: Some(tx),
        });
        rx.await
            .unwrap_or_else(|_| Err(BackendError::Transport("reply dropped".into())))
    }
}

pub fn projects() -> Vec<Project> {
    vec![
        Project::new("beta", "/src/beta"),
        Project::new("alpha", "/src/alpha"),
    ]
}

pub fn snippet(path: &str, line_number: usize, text: &str) -> Snippet {
    let matches = if text.is_empty() {
        Vec::new()
    } else {
        vec![Match::new(0, text.chars().count())]
    };
    Snippet::new(FileRef::new(path), line_number, vec![Line::new(text, matches)])
}

pub fn results(hits: &[(&str, usize)]) -> SearchResult {
    SearchResult::new(
        hits.iter()
            .map(|(path, line)| snippet(path, *line, "hit"))
            .collect(),
    )
}

pub fn file_content(path: &str, text: &str) -> FileSnippets {
    FileSnippets::new(FileRef::new(path), vec![snippet(path, 1, text)])
}

pub struct Harness {
    pub backend: Arc<ScriptedBackend>,
    pub store: Arc<MemoryProjectStore>,
    pub sink: Arc<RecordingSink>,
    pub session: Session,
}

impl Harness {
    pub fn new(store: MemoryProjectStore) -> Self {
        let backend = ScriptedBackend::new(projects());
        let store = Arc::new(store);
        let sink = Arc::new(RecordingSink::new());
        let session = Session::new(backend.clone(), store.clone())
            .with_sink(sink.clone());
        Self {
            backend,
            store,
            sink,
            session,
        }
    }

    pub async fn started() -> Self {
        let mut harness = Self::new(MemoryProjectStore::new());
        harness.session.start().await.expect("start session");
        harness
    }
}
