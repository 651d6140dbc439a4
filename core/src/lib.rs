pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod group;
pub mod model;
pub mod persist;
pub mod pinned;
pub mod sequencer;
pub mod session;

pub use backend::{Backend, FileRequest, SearchRequest};
pub use config::SessionConfig;
pub use diagnostics::{Diagnostic, DiagnosticSink, RecordingSink, TracingSink};
pub use error::{BackendError, SessionError, SessionResult, StoreError};
pub use group::{FileGroup, GroupedResult, group};
pub use model::{FileRef, FileSnippets, Line, Match, Project, SearchResult, Snippet};
pub use persist::{MemoryProjectStore, ProjectStore};
pub use pinned::{PinnedFile, PinnedFiles, PinnedSnapshot};
pub use sequencer::{RequestClass, Sequencer, Ticket};
pub use session::{CompletionOutcome, Session, SessionWatch};
