use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::backend::{Backend, FileRequest, SearchRequest};
use crate::config::SessionConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::{BackendError, SessionError, SessionResult};
use crate::group::{GroupedResult, group};
use crate::model::{FileSnippets, Project, SearchResult};
use crate::persist::ProjectStore;
use crate::pinned::{PinnedFiles, PinnedSnapshot};
use crate::sequencer::{RequestClass, Sequencer, Ticket};

enum Completion {
    Search {
        ticket: Ticket,
        project: String,
        query: String,
        result: Result<SearchResult, BackendError>,
    },
    File {
        ticket: Ticket,
        project: String,
        result: Result<FileSnippets, BackendError>,
    },
}

/// What happened to one completion when it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    SearchApplied,
    /// A newer search was issued (or the project changed) meanwhile.
    SearchDiscarded,
    FileApplied(String),
    /// Superseded, or the file was closed before its content arrived.
    FileDiscarded(String),
    /// Reported to the diagnostic sink; nothing changed.
    Failed,
}

/// Receivers for everything a presentation layer renders.
#[derive(Debug, Clone)]
pub struct SessionWatch {
    pub project: watch::Receiver<Option<Project>>,
    pub projects: watch::Receiver<Vec<Project>>,
    pub grouped: watch::Receiver<Arc<GroupedResult>>,
    pub pinned: watch::Receiver<PinnedSnapshot>,
}

struct Publisher {
    project: watch::Sender<Option<Project>>,
    projects: watch::Sender<Vec<Project>>,
    grouped: watch::Sender<Arc<GroupedResult>>,
    pinned: watch::Sender<PinnedSnapshot>,
}

impl Publisher {
    fn new() -> Self {
        Self {
            project: watch::channel(None).0,
            projects: watch::channel(Vec::new()).0,
            grouped: watch::channel(Arc::new(GroupedResult::default())).0,
            pinned: watch::channel(PinnedSnapshot::default()).0,
        }
    }
}

/// One client session against a code-search backend.
///
/// All state lives here and is only mutated through `&mut self`. Fetches run
/// as spawned tasks that report back over a channel; `process_next` and
/// `drain` apply those completions, checking admission and writing in the
/// same synchronous step. Methods that issue fetches must be called from
/// within a Tokio runtime.
pub struct Session {
    backend: Arc<dyn Backend>,
    store: Arc<dyn ProjectStore>,
    sink: Arc<dyn DiagnosticSink>,
    config: SessionConfig,
    projects: Vec<Project>,
    project: Option<Project>,
    query: String,
    file_filter: String,
    pinned: PinnedFiles,
    grouped: Arc<GroupedResult>,
    searches: Sequencer,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    publisher: Publisher,
}

impl Session {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<dyn ProjectStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            backend,
            store,
            sink: Arc::new(TracingSink),
            config: SessionConfig::default(),
            projects: Vec::new(),
            project: None,
            query: String::new(),
            file_filter: String::new(),
            pinned: PinnedFiles::new(),
            grouped: Arc::new(GroupedResult::default()),
            searches: Sequencer::new(),
            tx,
            rx,
            publisher: Publisher::new(),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn subscribe(&self) -> SessionWatch {
        SessionWatch {
            project: self.publisher.project.subscribe(),
            projects: self.publisher.projects.subscribe(),
            grouped: self.publisher.grouped.subscribe(),
            pinned: self.publisher.pinned.subscribe(),
        }
    }

    /// Load the project list and open the persisted project, or the first one
    /// by name when nothing (or nothing still listed) was persisted.
    pub async fn start(&mut self) -> SessionResult<()> {
        let mut projects = self.backend.list_projects().await?;
        if projects.is_empty() {
            return Err(SessionError::NoProjects);
        }
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        info!("backend lists {} projects", projects.len());
        self.projects = projects;
        self.publisher.projects.send_replace(self.projects.clone());

        let restored = match self.store.load() {
            Ok(restored) => restored,
            Err(err) => {
                self.sink.report(Diagnostic::Restore {
                    error: err.to_string(),
                });
                None
            }
        };
        let initial = restored
            .filter(|name| self.projects.iter().any(|p| &p.name == name))
            .unwrap_or_else(|| self.projects[0].name.clone());

        self.change_project(&initial)
    }

    /// Switch to another listed project. Pinned files, results and sequence
    /// counters are reset; completions still in flight for the old project
    /// are discarded when they land. An active query is re-run against the
    /// new project when configured to.
    pub fn change_project(&mut self, name: &str) -> SessionResult<()> {
        let project = self
            .projects
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| SessionError::UnknownProject(name.to_string()))?;

        info!("switching to project {} ({})", project.name, project.path.display());

        let retained_query = std::mem::take(&mut self.query);
        let retained_filter = std::mem::take(&mut self.file_filter);
        self.pinned.clear();
        self.grouped = Arc::new(GroupedResult::default());
        self.searches.reset();
        self.project = Some(project);

        if let Err(err) = self.store.save(name) {
            self.sink.report(Diagnostic::persist(name, &err));
        }

        self.publisher.project.send_replace(self.project.clone());
        self.publish_grouped();
        self.publish_pinned();

        if self.config.rerun_query_on_project_change && self.config.accepts_query(&retained_query) {
            debug!("re-running '{}' after project switch", retained_query);
            self.search(&retained_query, &retained_filter);
        }
        Ok(())
    }

    /// Record the query and, if it is long enough, search for it and refresh
    /// every pinned file against it. Short queries leave the displayed
    /// results alone.
    pub fn search(&mut self, query: &str, file_filter: &str) {
        self.query = query.to_string();
        self.file_filter = file_filter.to_string();

        if !self.config.accepts_query(query) {
            debug!("query '{}' below {} chars; not searching", query, self.config.min_query_chars);
            return;
        }
        let Some(project) = self.project.clone() else {
            debug!("no project selected; not searching");
            return;
        };

        let ticket = self.searches.issue(RequestClass::Search);
        debug!("search #{} for '{}' in {}", ticket.id, query, project.name);
        let request = SearchRequest {
            query: self.query.clone(),
            file_filter: self.file_filter.clone(),
            context_before: self.config.context_before,
            context_after: self.config.context_after,
        };
        self.spawn_search(project.clone(), ticket, request);

        for ticket in self.pinned.refresh_all() {
            self.spawn_file(project.clone(), ticket);
        }
    }

    /// Pin a file and fetch it highlighted against the current query.
    pub fn open_file(&mut self, path: &str) {
        let Some(project) = self.project.clone() else {
            debug!("no project selected; not opening {}", path);
            return;
        };
        let ticket = self.pinned.add(path);
        self.publish_pinned();
        match ticket {
            Some(ticket) => self.spawn_file(project, ticket),
            None => debug!("fetch for {} already in flight", path),
        }
    }

    pub fn close_file(&mut self, path: &str) -> bool {
        let closed = self.pinned.close(path);
        if closed {
            self.publish_pinned();
        }
        closed
    }

    pub fn select_file(&mut self, path: &str) -> bool {
        let selected = self.pinned.select(path);
        if selected {
            self.publish_pinned();
        }
        selected
    }

    /// Wait for the next completion and apply it.
    ///
    /// Cancel safe: dropping the future before it resolves loses nothing.
    pub async fn process_next(&mut self) -> Option<CompletionOutcome> {
        let completion = self.rx.recv().await?;
        Some(self.apply(completion))
    }

    /// Apply every completion that has already arrived.
    pub fn drain(&mut self) -> Vec<CompletionOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            outcomes.push(self.apply(completion));
        }
        outcomes
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn file_filter(&self) -> &str {
        &self.file_filter
    }

    pub fn grouped(&self) -> &Arc<GroupedResult> {
        &self.grouped
    }

    pub fn pinned(&self) -> &PinnedFiles {
        &self.pinned
    }

    fn apply(&mut self, completion: Completion) -> CompletionOutcome {
        match completion {
            Completion::Search {
                ticket,
                project,
                query,
                result,
            } => match result {
                Ok(result) => {
                    if !self.searches.admit(&ticket) {
                        debug!("discarding stale search #{} for '{}'", ticket.id, query);
                        return CompletionOutcome::SearchDiscarded;
                    }
                    self.grouped = Arc::new(group(result));
                    debug!(
                        "search #{} applied: {} files, {} snippets",
                        ticket.id,
                        self.grouped.file_count(),
                        self.grouped.snippet_count()
                    );
                    self.publish_grouped();
                    CompletionOutcome::SearchApplied
                }
                Err(error) => {
                    self.searches.abandon(&ticket);
                    self.sink.report(Diagnostic::Search {
                        project,
                        query,
                        error,
                    });
                    CompletionOutcome::Failed
                }
            },
            Completion::File {
                ticket,
                project,
                result,
            } => {
                let path = ticket.path().unwrap_or_default().to_string();
                match result {
                    Ok(content) => {
                        if !self.pinned.complete(&ticket, content) {
                            debug!("discarding stale content for {}", path);
                            return CompletionOutcome::FileDiscarded(path);
                        }
                        self.publish_pinned();
                        CompletionOutcome::FileApplied(path)
                    }
                    Err(error) => {
                        self.pinned.fail(&ticket);
                        self.sink.report(Diagnostic::File {
                            project,
                            path,
                            error,
                        });
                        CompletionOutcome::Failed
                    }
                }
            }
        }
    }

    fn spawn_search(&self, project: Project, ticket: Ticket, request: SearchRequest) {
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = backend.search_project(&project, &request).await;
            let _ = tx.send(Completion::Search {
                ticket,
                project: project.name,
                query: request.query,
                result,
            });
        });
    }

    fn spawn_file(&self, project: Project, ticket: Ticket) {
        let Some(path) = ticket.path() else {
            return;
        };
        let request = FileRequest {
            path: path.to_string(),
            query: self.query.clone(),
        };
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = backend.fetch_file(&project, &request).await;
            let _ = tx.send(Completion::File {
                ticket,
                project: project.name,
                result,
            });
        });
    }

    fn publish_grouped(&self) {
        self.publisher.grouped.send_replace(Arc::clone(&self.grouped));
    }

    fn publish_pinned(&self) {
        self.publisher.pinned.send_replace(self.pinned.snapshot());
    }
}
