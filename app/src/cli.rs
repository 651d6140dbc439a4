use std::path::PathBuf;
use std::sync::Arc;

use codesearch_core::{Backend, CompletionOutcome, Session, SessionConfig};
use codesearch_store::FileProjectStore;
use tracing::{error, info};

use crate::console::{render_grouped, run_console};
use crate::http::HttpBackend;

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub backend_url: String,
    pub state_file: Option<PathBuf>,
    pub config: SessionConfig,
}

/// Initialize tracing.
///
/// Stdout belongs to the console, so logs go to stderr and respect RUST_LOG
/// or default to `info`. If `CODESEARCH_LOG_PATH` is set they are appended to
/// that file instead.
pub fn init_tracing() {
    use std::fs::OpenOptions;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let path = match std::env::var("CODESEARCH_LOG_PATH") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            return;
        }
    };

    // Validate the path once; an unusable log file disables logging rather
    // than polluting the console.
    if OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .is_err()
    {
        return;
    }

    let make_writer = move || {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .expect("failed to open CODESEARCH_LOG_PATH for logging")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(make_writer)
        .init();
}

fn open_backend(opts: &ClientOptions) -> Arc<HttpBackend> {
    match HttpBackend::new(&opts.backend_url) {
        Ok(backend) => Arc::new(backend),
        Err(err) => {
            error!("Invalid backend URL '{}': {}", opts.backend_url, err);
            std::process::exit(2);
        }
    }
}

async fn start_session(opts: &ClientOptions, project: Option<String>) -> Session {
    let backend = open_backend(opts);
    let store = match &opts.state_file {
        Some(path) => FileProjectStore::new(path),
        None => FileProjectStore::at_default_location(),
    };
    info!("backend: {}", opts.backend_url);
    info!("state file: {}", store.path().display());

    let mut session = Session::new(backend, Arc::new(store)).with_config(opts.config.clone());
    if let Err(err) = session.start().await {
        error!("Failed to start session: {}", err);
        std::process::exit(1);
    }

    if let Some(name) = project
        && let Err(err) = session.change_project(&name)
    {
        error!("{}", err);
        std::process::exit(1);
    }
    session
}

pub async fn run_projects(opts: ClientOptions) -> Result<(), Box<dyn std::error::Error>> {
    let backend = open_backend(&opts);
    let mut projects = match backend.list_projects().await {
        Ok(p) => p,
        Err(err) => {
            error!("Listing projects failed: {}", err);
            std::process::exit(1);
        }
    };
    projects.sort_by(|a, b| a.name.cmp(&b.name));

    for project in projects {
        println!("{}\t{}", project.name, project.path.display());
    }
    Ok(())
}

pub async fn run_search(
    opts: ClientOptions,
    project: Option<String>,
    file_filter: String,
    query: String,
) -> Result<(), Box<dyn std::error::Error>> {
    if !opts.config.accepts_query(&query) {
        error!(
            "Query '{}' is too short; at least {} characters are needed",
            query, opts.config.min_query_chars
        );
        std::process::exit(2);
    }

    let mut session = start_session(&opts, project).await;
    session.search(&query, &file_filter);

    while let Some(outcome) = session.process_next().await {
        match outcome {
            CompletionOutcome::SearchApplied => break,
            CompletionOutcome::Failed => {
                error!("Search failed");
                std::process::exit(1);
            }
            _ => {}
        }
    }

    print!("{}", render_grouped(session.grouped(), usize::MAX, usize::MAX));
    Ok(())
}

pub async fn run_interactive(
    opts: ClientOptions,
    project: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = start_session(&opts, project).await;
    run_console(session).await
}
