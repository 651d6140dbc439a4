use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::model::{FileSnippets, Project, SearchResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub file_filter: String,
    pub context_before: usize,
    pub context_after: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRequest {
    pub path: String,
    pub query: String,
}

/// The code-search service. Implementations only move data; ordering and
/// staleness are handled by the session.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn list_projects(&self) -> Result<Vec<Project>, BackendError>;

    async fn search_project(
        &self,
        project: &Project,
        request: &SearchRequest,
    ) -> Result<SearchResult, BackendError>;

    async fn fetch_file(
        &self,
        project: &Project,
        request: &FileRequest,
    ) -> Result<FileSnippets, BackendError>;
}
