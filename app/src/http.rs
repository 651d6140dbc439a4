use std::time::Duration;

use async_trait::async_trait;
use codesearch_core::{
    Backend, BackendError, FileRequest, FileSnippets, Project, SearchRequest, SearchResult,
};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Talks to a codesearch server over plain HTTP GETs with JSON bodies.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: Url,
}

fn transport(err: impl std::fmt::Display) -> BackendError {
    BackendError::Transport(err.to_string())
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url).map_err(transport)?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Transport(format!(
                "{base_url} cannot be used as a base URL"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(transport)?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) fn projects_url(&self) -> Url {
        self.endpoint(&["projects"])
    }

    pub(crate) fn search_url(&self, project: &Project, request: &SearchRequest) -> Url {
        let mut url = self.endpoint(&["search", &project.name]);
        url.query_pairs_mut()
            .append_pair("query", &request.query)
            .append_pair("file", &request.file_filter)
            .append_pair("above", &request.context_before.to_string())
            .append_pair("below", &request.context_after.to_string());
        url
    }

    pub(crate) fn file_url(&self, project: &Project, request: &FileRequest) -> Url {
        let mut url = self.endpoint(&["file", &project.name]);
        url.query_pairs_mut()
            .append_pair("file", &request.path)
            .append_pair("query", &request.query);
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, BackendError> {
        debug!("GET {url}");
        let resp = self.http.get(url).send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }
        let body = resp.bytes().await.map_err(transport)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_projects(&self) -> Result<Vec<Project>, BackendError> {
        self.get_json(self.projects_url()).await
    }

    async fn search_project(
        &self,
        project: &Project,
        request: &SearchRequest,
    ) -> Result<SearchResult, BackendError> {
        self.get_json(self.search_url(project, request)).await
    }

    async fn fetch_file(
        &self,
        project: &Project,
        request: &FileRequest,
    ) -> Result<FileSnippets, BackendError> {
        self.get_json(self.file_url(project, request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project::new("my project", "/src/my-project")
    }

    #[test]
    fn endpoints_hang_off_the_base_path() {
        let backend = HttpBackend::new("http://127.0.0.1:8000").unwrap();
        assert_eq!(backend.projects_url().as_str(), "http://127.0.0.1:8000/projects");

        let nested = HttpBackend::new("http://localhost:8000/api/").unwrap();
        assert_eq!(nested.projects_url().as_str(), "http://localhost:8000/api/projects");
    }

    #[test]
    fn search_url_carries_query_filter_and_context() {
        let backend = HttpBackend::new("http://localhost:8000").unwrap();
        let request = SearchRequest {
            query: "fn main".to_string(),
            file_filter: "*.rs".to_string(),
            context_before: 2,
            context_after: 3,
        };
        assert_eq!(
            backend.search_url(&project(), &request).as_str(),
            "http://localhost:8000/search/my%20project?query=fn+main&file=*.rs&above=2&below=3"
        );
    }

    #[test]
    fn file_url_escapes_path() {
        let backend = HttpBackend::new("http://localhost:8000").unwrap();
        let request = FileRequest {
            path: "src/a b.rs".to_string(),
            query: "x&y".to_string(),
        };
        assert_eq!(
            backend.file_url(&project(), &request).as_str(),
            "http://localhost:8000/file/my%20project?file=src%2Fa+b.rs&query=x%26y"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(HttpBackend::new("not a url").is_err());
        assert!(HttpBackend::new("mailto:someone@example.com").is_err());
    }
}
