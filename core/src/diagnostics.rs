use std::fmt;
use std::sync::Mutex;

use tracing::warn;

use crate::error::{BackendError, StoreError};

/// A failure the session swallowed after keeping its previous state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Search {
        project: String,
        query: String,
        error: BackendError,
    },
    File {
        project: String,
        path: String,
        error: BackendError,
    },
    Persist {
        project: String,
        error: String,
    },
    Restore {
        error: String,
    },
}

impl Diagnostic {
    pub(crate) fn persist(project: &str, error: &StoreError) -> Self {
        Diagnostic::Persist {
            project: project.to_string(),
            error: error.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Search {
                project,
                query,
                error,
            } => write!(f, "search '{query}' in {project} failed: {error}"),
            Diagnostic::File {
                project,
                path,
                error,
            } => write!(f, "fetching {path} in {project} failed: {error}"),
            Diagnostic::Persist { project, error } => {
                write!(f, "persisting project {project} failed: {error}")
            }
            Diagnostic::Restore { error } => {
                write!(f, "restoring the last project failed: {error}")
            }
        }
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink: a `warn!` event per failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        warn!("{diagnostic}");
    }
}

/// Keeps every report in memory; handy for presentations that show an error
/// log, and for tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Diagnostic> {
        self.reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic) {
        warn!("{diagnostic}");
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(diagnostic);
        }
    }
}
