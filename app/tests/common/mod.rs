//! Test helper module for E2E tests
//!
//! Provides `TestFixture` (a temp dir for the state file) plus a wiremock
//! server standing in for the codesearch backend.

#![allow(dead_code)] // Test helpers may not be used in all test modules
#![allow(deprecated)] // cargo_bin() deprecation - the new API requires more investigation

use assert_cmd::Command;
use assert_fs::TempDir;
use std::path::PathBuf;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PROJECTS: &str =
    r#"[{"name":"beta","path":"/src/beta"},{"name":"alpha","path":"/src/alpha"}]"#;

pub fn snippet_json(path: &str, line_number: usize, text: &str, m: (usize, usize)) -> String {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    format!(
        r#"{{"file":{{"path":"{path}","extension":"{extension}"}},"line_number":{line_number},"lines":[{{"full":"{text}","matches":[[{},{}]]}}],"hash":{line_number}}}"#,
        m.0, m.1
    )
}

/// Answer `GET route` with `status` and a JSON body.
pub async fn mount_json(server: &MockServer, route: &str, status: u16, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_raw(body.into(), "application/json"))
        .mount(server)
        .await;
}

/// Backend serving two projects with distinct search results. Unmatched
/// routes answer 404.
pub async fn backend() -> MockServer {
    let server = MockServer::start().await;
    mount_json(&server, "/projects", 200, PROJECTS).await;
    mount_json(
        &server,
        "/search/alpha",
        200,
        format!(
            "[{},{},{}]",
            snippet_json("src/z.rs", 40, "let needle = 2;", (4, 10)),
            snippet_json("src/a.rs", 12, "fn needle() {}", (3, 9)),
            snippet_json("src/z.rs", 3, "// needle", (3, 9)),
        ),
    )
    .await;
    mount_json(
        &server,
        "/search/beta",
        200,
        format!("[{}]", snippet_json("beta.py", 1, "needle = True", (0, 6))),
    )
    .await;
    server
}

/// Test fixture providing a temporary directory for client state and
/// helpers for running the `cs` CLI.
pub struct TestFixture {
    pub dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn state_file(&self) -> PathBuf {
        self.dir.path().join("state.json")
    }

    pub fn saved_state(&self) -> String {
        std::fs::read_to_string(self.state_file()).unwrap_or_default()
    }

    /// Create a Command for running `cs` against `backend_url`
    pub fn cs(&self, backend_url: &str) -> Command {
        let mut cmd = Command::cargo_bin("cs").unwrap();
        cmd.current_dir(self.dir.path())
            .env("CODESEARCH_BACKEND_URL", backend_url)
            .env("CODESEARCH_STATE_FILE", self.state_file())
            .env_remove("CODESEARCH_LOG_PATH")
            .env("RUST_LOG", "info");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
