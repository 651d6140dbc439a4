use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use codesearch_core::SessionConfig;
use codesearch_core::config::{DEFAULT_CONTEXT_LINES, DEFAULT_MIN_QUERY_CHARS};

mod cli;
mod console;
mod http;

use crate::cli::{ClientOptions, init_tracing, run_interactive, run_projects, run_search};

#[derive(ClapArgs, Debug)]
struct Global {
    /// Base URL of the codesearch server
    #[arg(
        long,
        env = "CODESEARCH_BACKEND_URL",
        default_value = "http://127.0.0.1:8000",
        global = true
    )]
    backend_url: String,
    /// File remembering the last chosen project
    #[arg(long, env = "CODESEARCH_STATE_FILE", global = true)]
    state_file: Option<PathBuf>,
    /// Queries shorter than this many characters are not sent
    #[arg(long, default_value_t = DEFAULT_MIN_QUERY_CHARS, global = true)]
    min_query_chars: usize,
    /// Context lines requested around each match
    #[arg(long, default_value_t = DEFAULT_CONTEXT_LINES, global = true)]
    context: usize,
    /// Keep the query empty after switching projects instead of re-running it
    #[arg(long, global = true)]
    no_rerun: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the projects the server knows about
    Projects,
    /// Run one search and print the grouped results
    Search {
        /// Project to search (defaults to the last one used)
        #[arg(long)]
        project: Option<String>,
        /// Glob restricting which files are searched
        #[arg(long, default_value = "")]
        filter: String,
        /// Search query
        query: String,
    },
    /// Interactive session on stdin/stdout
    Console {
        /// Project to open (defaults to the last one used)
        #[arg(long)]
        project: Option<String>,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = "cs",
    about = "codesearch: interactive client for a code-search server",
    version,
    long_about = None
)]
struct Args {
    #[command(flatten)]
    global: Global,
    #[command(subcommand)]
    command: Command,
}

impl Global {
    fn into_options(self) -> ClientOptions {
        ClientOptions {
            backend_url: self.backend_url,
            state_file: self.state_file,
            config: SessionConfig {
                min_query_chars: self.min_query_chars,
                context_before: self.context,
                context_after: self.context,
                rerun_query_on_project_change: !self.no_rerun,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing();
    let opts = args.global.into_options();

    match args.command {
        Command::Projects => run_projects(opts).await?,
        Command::Search {
            project,
            filter,
            query,
        } => run_search(opts, project, filter, query).await?,
        Command::Console { project } => run_interactive(opts, project).await?,
    }

    Ok(())
}
