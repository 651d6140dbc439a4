use std::error::Error;

use codesearch_core::{
    CompletionOutcome, GroupedResult, Line, PinnedSnapshot, Project, Session, Snippet,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Matching files whose snippets are shown; the rest are listed by path only.
pub const MAX_EXPANDED_FILES: usize = 10;
pub const MAX_SNIPPETS_PER_FILE: usize = 3;

const HELP: &str = "\
commands:
  <text>           search for <text> (at least the configured minimum length)
  :filter GLOB     restrict results to files matching GLOB (empty clears)
  :projects        list projects
  :project NAME    switch project
  :open PATH       pin a file
  :close PATH      unpin a file
  :select PATH     show a pinned file
  :files           show pinned files
  :help            this text
  :quit            exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Query(String),
    Filter(String),
    Projects,
    Project(String),
    Open(String),
    Close(String),
    Select(String),
    Files,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(ConsoleCommand::Query(line.to_string()));
    };

    let (name, arg) = match rest.split_once(' ') {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let required = |usage: &str| {
        if arg.is_empty() {
            Err(format!("usage: {usage}"))
        } else {
            Ok(arg.to_string())
        }
    };

    match name {
        "filter" => Ok(ConsoleCommand::Filter(arg.to_string())),
        "projects" => Ok(ConsoleCommand::Projects),
        "project" => required(":project NAME").map(ConsoleCommand::Project),
        "open" => required(":open PATH").map(ConsoleCommand::Open),
        "close" => required(":close PATH").map(ConsoleCommand::Close),
        "select" => required(":select PATH").map(ConsoleCommand::Select),
        "files" => Ok(ConsoleCommand::Files),
        "help" | "h" => Ok(ConsoleCommand::Help),
        "quit" | "q" => Ok(ConsoleCommand::Quit),
        other => Err(format!("unknown command :{other} (try :help)")),
    }
}

/// Line text with every match wrapped in brackets. Match ranges count
/// characters; ranges past the end of the line are clamped.
pub fn render_line(line: &Line) -> String {
    let chars: Vec<char> = line.text.chars().collect();
    let mut ranges: Vec<(usize, usize)> = line
        .matches
        .iter()
        .map(|m| (m.start.min(chars.len()), m.end.min(chars.len())))
        .filter(|(start, end)| start < end)
        .collect();
    ranges.sort_unstable();

    let mut out = String::with_capacity(line.text.len() + ranges.len() * 2);
    let mut pos = 0;
    for (start, end) in ranges {
        // overlapping ranges merge into the previous one
        let start = start.max(pos);
        if start >= end {
            continue;
        }
        out.extend(&chars[pos..start]);
        out.push('[');
        out.extend(&chars[start..end]);
        out.push(']');
        pos = end;
    }
    out.extend(&chars[pos..]);
    out
}

fn render_snippet(out: &mut String, snippet: &Snippet) {
    for (offset, line) in snippet.lines.iter().enumerate() {
        out.push_str(&format!(
            "{:>6}: {}\n",
            snippet.line_number + offset,
            render_line(line)
        ));
    }
}

pub fn render_grouped(grouped: &GroupedResult, max_files: usize, max_snippets: usize) -> String {
    if grouped.is_empty() {
        return "no results\n".to_string();
    }

    let mut out = format!(
        "{} matches in {} files\n",
        grouped.match_count(),
        grouped.file_count()
    );
    for (idx, group) in grouped.iter().enumerate() {
        out.push_str(&format!("== {} ({})\n", group.file.path, group.match_count()));
        if idx >= max_files {
            continue;
        }
        for (n, snippet) in group.snippets.iter().enumerate() {
            if n >= max_snippets {
                out.push_str(&format!(
                    "   ... {} more\n",
                    group.snippets.len() - max_snippets
                ));
                break;
            }
            render_snippet(&mut out, snippet);
        }
    }
    out
}

pub fn render_pinned(pinned: &PinnedSnapshot) -> String {
    if pinned.files.is_empty() {
        return "no pinned files\n".to_string();
    }

    let tabs: Vec<String> = pinned
        .files
        .iter()
        .map(|file| {
            if pinned.selected.as_deref() == Some(file.path.as_str()) {
                format!("[{}]", file.path)
            } else {
                file.path.clone()
            }
        })
        .collect();
    let mut out = format!("tabs: {}\n", tabs.join(" | "));

    if let Some(file) = pinned.selected_file() {
        match &file.content {
            Some(content) => {
                out.push_str(&format!("== {} ({} matches)\n", file.path, content.match_count));
                for snippet in &content.snippets {
                    render_snippet(&mut out, snippet);
                }
            }
            None => out.push_str(&format!("== {} (loading)\n", file.path)),
        }
    }
    out
}

fn render_projects(projects: &[Project], current: Option<&Project>) -> String {
    let mut out = String::new();
    for project in projects {
        let marker = if current.is_some_and(|c| c.name == project.name) {
            '*'
        } else {
            ' '
        };
        out.push_str(&format!("{marker} {}\t{}\n", project.name, project.path.display()));
    }
    out
}

fn apply_command(session: &mut Session, filter: &mut String, command: ConsoleCommand) {
    match command {
        ConsoleCommand::Query(query) => session.search(&query, filter),
        ConsoleCommand::Filter(glob) => {
            *filter = glob;
            let query = session.query().to_string();
            session.search(&query, filter);
        }
        ConsoleCommand::Projects => {
            print!("{}", render_projects(session.projects(), session.project()));
        }
        ConsoleCommand::Project(name) => {
            if let Err(err) = session.change_project(&name) {
                eprintln!("{err}");
            } else {
                filter.clear();
                filter.push_str(session.file_filter());
            }
        }
        ConsoleCommand::Open(path) => session.open_file(&path),
        ConsoleCommand::Close(path) => {
            if !session.close_file(&path) {
                eprintln!("{path} is not pinned");
            }
        }
        ConsoleCommand::Select(path) => {
            if !session.select_file(&path) {
                eprintln!("{path} is not pinned");
            }
        }
        ConsoleCommand::Files => print!("{}", render_pinned(&session.pinned().snapshot())),
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Quit => {}
    }
}

/// Read commands from stdin and print results as they land, until `:quit`,
/// end of input or Ctrl-C.
pub async fn run_console(mut session: Session) -> Result<(), Box<dyn Error>> {
    let mut watch = session.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut filter = session.file_filter().to_string();

    if let Some(project) = session.project() {
        println!("project {} ({}); :help for commands", project.name, project.path.display());
    }

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(ConsoleCommand::Quit) => break,
                    Ok(command) => apply_command(&mut session, &mut filter, command),
                    Err(usage) => eprintln!("{usage}"),
                }
            }
            outcome = session.process_next() => {
                match outcome {
                    Some(CompletionOutcome::Failed) => warn!("request failed; keeping previous results"),
                    Some(outcome) => debug!("completion: {outcome:?}"),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }

        if watch.project.has_changed().unwrap_or(false)
            && let Some(project) = watch.project.borrow_and_update().as_ref()
        {
            println!("project {} ({})", project.name, project.path.display());
        }
        if watch.grouped.has_changed().unwrap_or(false) {
            let grouped = watch.grouped.borrow_and_update().clone();
            print!(
                "{}",
                render_grouped(&grouped, MAX_EXPANDED_FILES, MAX_SNIPPETS_PER_FILE)
            );
        }
        if watch.pinned.has_changed().unwrap_or(false) {
            let pinned = watch.pinned.borrow_and_update().clone();
            print!("{}", render_pinned(&pinned));
        }
    }

    Ok(())
}
