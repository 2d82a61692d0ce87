//! Workspace view: file tree, file viewer and the default shell.

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use rustyline::error::ReadlineError;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::assistant::{AssistantSession, ReplExit};
use super::{build_editor, take_flag};
use crate::storage::{ProjectFile, WorkspaceStore};
use crate::AppContext;

// ─── File Tree ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileNode {
    pub name: String,
    /// `/` followed by the path components up to this node.
    pub path: String,
    pub kind: NodeKind,
    pub children: Vec<FileNode>,
}

/// Group flat file paths into a tree.
///
/// Empty components are dropped, the last component is a file and the rest
/// are folders. Siblings keep the order in which they first appear.
pub fn build_file_tree<S: AsRef<str>>(paths: &[S]) -> Vec<FileNode> {
    let mut root: Vec<FileNode> = Vec::new();

    for raw in paths {
        let parts: Vec<&str> = raw.as_ref().split('/').filter(|p| !p.is_empty()).collect();
        let mut level = &mut root;

        for (i, part) in parts.iter().enumerate() {
            let index = match level.iter().position(|node| node.name == *part) {
                Some(index) => index,
                None => {
                    let kind = if i + 1 == parts.len() {
                        NodeKind::File
                    } else {
                        NodeKind::Folder
                    };
                    level.push(FileNode {
                        name: part.to_string(),
                        path: format!("/{}", parts[..=i].join("/")),
                        kind,
                        children: Vec::new(),
                    });
                    level.len() - 1
                }
            };
            level = &mut level[index].children;
        }
    }

    root
}

/// Plain-text rendering of a project's files, with a header line.
pub fn render_file_tree(files: &[ProjectFile]) -> String {
    if files.is_empty() {
        return "Workspace (0 files)\n  No files yet. Use AI to create your first file.\n".to_string();
    }

    let paths: Vec<&str> = files.iter().map(|f| f.file_path.as_str()).collect();
    let mut out = format!(
        "Workspace ({} file{})\n",
        files.len(),
        if files.len() == 1 { "" } else { "s" }
    );
    render_nodes(&build_file_tree(&paths), 1, &mut out);
    out
}

fn render_nodes(nodes: &[FileNode], depth: usize, out: &mut String) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        match node.kind {
            NodeKind::Folder => out.push_str(&format!("{indent}{}/\n", node.name)),
            NodeKind::File => out.push_str(&format!("{indent}{}\n", node.name)),
        }
        render_nodes(&node.children, depth + 1, out);
    }
}

// ─── Printing ───────────────────────────────────────────────────────────────

pub async fn print_files(store: &dyn WorkspaceStore, project_id: &str) -> anyhow::Result<()> {
    let files = store.list_project_files(project_id).await?;
    print!("{}", render_file_tree(&files));
    Ok(())
}

pub async fn print_file(store: &dyn WorkspaceStore, project_id: &str, path: &str) -> anyhow::Result<()> {
    let content = store.read_file(project_id, path).await?;
    println!("{}", format!("── {path} ──").bold());
    println!("{content}");
    Ok(())
}

// ─── File Poller ────────────────────────────────────────────────────────────

/// Refresh `snapshot` with the project's files every `every`.
///
/// Failed polls are logged and the previous snapshot is kept.
pub fn spawn_file_poller(
    store: Arc<dyn WorkspaceStore>,
    project_id: String,
    every: Duration,
    snapshot: Arc<RwLock<Vec<ProjectFile>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match store.list_project_files(&project_id).await {
                Ok(files) => {
                    let mut current = snapshot.write().await;
                    if *current != files {
                        tracing::debug!(project_id = %project_id, count = files.len(), "workspace files changed");
                        *current = files;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to poll workspace files"),
            }
        }
    })
}

// ─── Shell ──────────────────────────────────────────────────────────────────

/// Default command: workspace header, file tree and a small command loop.
///
/// `Ctrl+L` (or `assistant`) opens the assistant; leaving it returns here.
pub async fn run_shell(ctx: &AppContext) -> anyhow::Result<()> {
    let (mut rl, open_assistant) = build_editor()?;

    let snapshot = Arc::new(RwLock::new(
        ctx.store.list_project_files(&ctx.project.id).await?,
    ));
    let poller = spawn_file_poller(
        ctx.store.clone(),
        ctx.project.id.clone(),
        Duration::from_secs(ctx.config.workspace.poll_interval_secs.max(1)),
        snapshot.clone(),
    );

    println!("{}", "WindCode".bold().green());
    println!(
        "{} {}",
        ctx.project.name.bold(),
        ctx.project.workspace_path.dimmed()
    );
    print!("{}", render_file_tree(&snapshot.read().await));
    println!(
        "Press {} for the AI assistant, type {} for commands.\n",
        "Ctrl+L".yellow(),
        "help".yellow()
    );

    let mut assistant: Option<AssistantSession> = None;
    let prompt = format!("{}> ", "workspace".green());

    let result = loop {
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) if take_flag(&open_assistant) => "assistant".to_string(),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break Ok(()),
            Err(e) => break Err(e.into()),
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(trimmed);

        let (command, arg) = match trimmed.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (trimmed, ""),
        };

        match command.trim_start_matches('/') {
            "quit" | "exit" | "q" => break Ok(()),
            "help" => print_shell_help(),
            "files" | "tree" | "ls" => print!("{}", render_file_tree(&snapshot.read().await)),
            "open" | "cat" if !arg.is_empty() => {
                if let Err(e) = print_file(ctx.store.as_ref(), &ctx.project.id, arg).await {
                    eprintln!("{}: {e}", "error".red());
                }
            }
            "open" | "cat" => eprintln!("usage: open <path>"),
            "assistant" | "ai" => {
                if assistant.is_none() {
                    match AssistantSession::open(ctx).await {
                        Ok(session) => assistant = Some(session),
                        Err(e) => {
                            eprintln!("{}: {e}", "error".red());
                            continue;
                        }
                    }
                }
                let Some(session) = assistant.as_mut() else {
                    continue;
                };
                match session.run(ctx).await {
                    Ok(ReplExit::Quit) => break Ok(()),
                    Ok(ReplExit::Back) => {
                        println!("{}", "back to workspace".dimmed());
                    }
                    Err(e) => eprintln!("{}: {e}", "error".red()),
                }
            }
            other => eprintln!("unknown command '{other}', type {}", "help".yellow()),
        }
    };

    poller.abort();
    result
}

fn print_shell_help() {
    println!("  {}        show the file tree", "files".yellow());
    println!("  {}  print a file", "open <path>".yellow());
    println!("  {}    open the AI assistant (Ctrl+L)", "assistant".yellow());
    println!("  {}         leave", "quit".yellow());
}

// ─── Tests ──────────────────────────────────────────────────────────────────
