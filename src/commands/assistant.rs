//! `windcode assistant`: the tool-calling assistant REPL.
//!
//! Plain input goes to the model. Mutating tool calls show up as numbered
//! pending actions that are resolved with `/approve` and `/decline`.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use super::workspace::{print_file, print_files};
use super::{build_editor, take_flag};
use crate::agent_core::tool_router::generate_preview;
use crate::agent_core::{
    PendingAction, RelayContext, RelayError, RelayEvent, ToolCallRelay, TurnOutcome,
};
use crate::inference::types::Role;
use crate::storage::ChatMessageRecord;
use crate::AppContext;

/// How the REPL was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplExit {
    /// `/quit`, Ctrl+C or Ctrl+D.
    Quit,
    /// Ctrl+L: back to the workspace view.
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlashCommand<'a> {
    Approve(Option<&'a str>),
    Decline(Option<&'a str>),
    Pending,
    Continue,
    Files,
    Open(Option<&'a str>),
    History,
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_slash(input: &str) -> Option<SlashCommand<'_>> {
    let rest = input.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };
    Some(match name {
        "approve" | "a" => SlashCommand::Approve(arg),
        "decline" | "d" => SlashCommand::Decline(arg),
        "pending" | "p" => SlashCommand::Pending,
        "continue" | "c" => SlashCommand::Continue,
        "files" => SlashCommand::Files,
        "open" => SlashCommand::Open(arg),
        "history" => SlashCommand::History,
        "help" | "?" => SlashCommand::Help,
        "quit" | "exit" | "q" => SlashCommand::Quit,
        other => SlashCommand::Unknown(other),
    })
}

/// Pick a pending action by 1-based number or by id.
///
/// Without a selector the only pending action is chosen.
fn select_action<'a>(pending: &'a [PendingAction], selector: Option<&str>) -> Result<&'a PendingAction, String> {
    match selector {
        None => match pending {
            [] => Err("no pending actions".to_string()),
            [only] => Ok(only),
            _ => Err(format!(
                "{} actions pending, pass a number (1-{}) or an id",
                pending.len(),
                pending.len()
            )),
        },
        Some(sel) => {
            if let Ok(n) = sel.parse::<usize>() {
                if let Some(action) = n.checked_sub(1).and_then(|i| pending.get(i)) {
                    return Ok(action);
                }
            }
            pending
                .iter()
                .find(|a| a.id == sel)
                .ok_or_else(|| format!("no pending action '{sel}'"))
        }
    }
}

/// An assistant conversation that survives leaving and re-entering the REPL.
pub struct AssistantSession {
    relay: ToolCallRelay,
    events: UnboundedReceiver<RelayEvent>,
    editor: DefaultEditor,
    back_requested: Arc<AtomicBool>,
}

impl AssistantSession {
    /// Start a new session for the current project.
    pub async fn open(ctx: &AppContext) -> anyhow::Result<Self> {
        let (tx, events) = unbounded_channel();
        let mut relay = ToolCallRelay::new(
            ctx.store.clone(),
            ctx.inference.clone(),
            RelayContext::new_session(&ctx.project.id),
            ctx.config.relay.clone(),
        )
        .with_events(tx);
        relay.load_history().await?;

        let (editor, back_requested) = build_editor()?;
        tracing::info!(
            session_id = %relay.context().session_id,
            project_id = %ctx.project.id,
            model = %ctx.inference.model(),
            "assistant session opened"
        );

        Ok(Self {
            relay,
            events,
            editor,
            back_requested,
        })
    }

    pub async fn run(&mut self, ctx: &AppContext) -> anyhow::Result<ReplExit> {
        println!("{}", "WindCode AI".bold().green());
        println!(
            "Model {} at {}. Type {} for commands, {} to exit.\n",
            ctx.inference.model().cyan(),
            ctx.inference.base_url().dimmed(),
            "/help".yellow(),
            "/quit".yellow()
        );
        if !self.relay.pending_actions().is_empty() {
            self.print_pending();
        }

        let prompt = format!("{}> ", "you".green());
        loop {
            let line = match self.editor.readline(&prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) if take_flag(&self.back_requested) => {
                    return Ok(ReplExit::Back);
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(ReplExit::Quit),
                Err(e) => return Err(e.into()),
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let _ = self.editor.add_history_entry(line.as_str());

            match parse_slash(trimmed) {
                Some(SlashCommand::Quit) => return Ok(ReplExit::Quit),
                Some(command) => self.handle_command(ctx, command).await,
                None => {
                    println!("{}", "thinking...".dimmed());
                    let outcome = self.relay.submit(trimmed).await;
                    self.finish(outcome);
                }
            }
        }
    }

    async fn handle_command(&mut self, ctx: &AppContext, command: SlashCommand<'_>) {
        match command {
            SlashCommand::Approve(sel) | SlashCommand::Decline(sel) => {
                let approve = matches!(command, SlashCommand::Approve(_));
                let id = match select_action(self.relay.pending_actions(), sel) {
                    Ok(action) => action.id.clone(),
                    Err(msg) => {
                        eprintln!("{}", msg.yellow());
                        return;
                    }
                };
                let outcome = if approve {
                    println!("{}", "running...".dimmed());
                    self.relay.approve(&id).await
                } else {
                    self.relay.decline(&id).await
                };
                self.finish(outcome);
            }
            SlashCommand::Pending => self.print_pending(),
            SlashCommand::Continue => {
                println!("{}", "thinking...".dimmed());
                let outcome = self.relay.continue_conversation().await;
                self.finish(outcome);
            }
            SlashCommand::Files => {
                if let Err(e) = print_files(ctx.store.as_ref(), &ctx.project.id).await {
                    eprintln!("{}: {e}", "error".red());
                }
            }
            SlashCommand::Open(Some(path)) => {
                if let Err(e) = print_file(ctx.store.as_ref(), &ctx.project.id, path).await {
                    eprintln!("{}: {e}", "error".red());
                }
            }
            SlashCommand::Open(None) => eprintln!("usage: /open <path>"),
            SlashCommand::History => {
                for record in self.relay.messages() {
                    print_record(record, true);
                }
            }
            SlashCommand::Help => print_help(),
            SlashCommand::Unknown(name) => {
                eprintln!("unknown command '/{name}', type {}", "/help".yellow());
            }
            SlashCommand::Quit => {}
        }
    }

    fn finish(&mut self, outcome: Result<TurnOutcome, RelayError>) {
        self.drain_events();
        match outcome {
            Ok(TurnOutcome::AwaitingApproval { pending }) => {
                println!(
                    "{}",
                    format!("{pending} action(s) awaiting approval: /approve [n] or /decline [n]").yellow()
                );
            }
            Ok(TurnOutcome::Halted) => {
                println!("{}", "stopped, /continue lets the model respond".dimmed());
            }
            Ok(TurnOutcome::RoundLimitReached) => {
                println!(
                    "{}",
                    "stopped after too many tool rounds, send a message to continue".yellow()
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "assistant turn failed");
                eprintln!("{}: {e}", "error".red());
            }
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                RelayEvent::MessageStored(record) => print_record(&record, false),
                RelayEvent::ActionStaged(action) => {
                    let number = self
                        .relay
                        .pending_actions()
                        .iter()
                        .position(|a| a.id == action.id)
                        .map_or(0, |i| i + 1);
                    print_action(number, &action);
                }
                RelayEvent::ActionResolved { approved: true, .. } => {
                    println!("{}", "approved".green());
                }
                RelayEvent::ActionResolved { approved: false, .. } => {
                    println!("{}", "declined".red());
                }
                RelayEvent::CompletionStarted | RelayEvent::CompletionFinished => {}
            }
        }
    }

    fn print_pending(&self) {
        let pending = self.relay.pending_actions();
        if pending.is_empty() {
            println!("{}", "no pending actions".dimmed());
        }
        for (i, action) in pending.iter().enumerate() {
            print_action(i + 1, action);
        }
    }
}

fn print_record(record: &ChatMessageRecord, include_user: bool) {
    match record.role {
        Role::User if include_user => println!("{} {}", "you>".green(), record.content),
        Role::Assistant if record.content.starts_with("Error: ") => {
            println!("{} {}", "windcode>".cyan().bold(), record.content.red());
        }
        Role::Assistant if !record.content.is_empty() => {
            println!("{} {}", "windcode>".cyan().bold(), record.content);
        }
        Role::Tool => {
            for line in record.content.lines() {
                println!("  {} {}", "│".dimmed(), line.dimmed());
            }
        }
        _ => {}
    }
}

fn print_action(number: usize, action: &PendingAction) {
    println!(
        "{} {}",
        format!("[{number}]").yellow().bold(),
        action.description.bold()
    );
    for line in generate_preview(action).lines() {
        println!("    {}", line.dimmed());
    }
}

fn print_help() {
    println!("  {}  run a pending action", "/approve [n|id]".yellow());
    println!("  {}  reject a pending action", "/decline [n|id]".yellow());
    println!("  {}         list pending actions", "/pending".yellow());
    println!("  {}        ask the model to go on", "/continue".yellow());
    println!("  {}           show the file tree", "/files".yellow());
    println!("  {}     print a file", "/open <path>".yellow());
    println!("  {}         show this conversation", "/history".yellow());
    println!("  {}            leave (Ctrl+L returns to the workspace)", "/quit".yellow());
    println!("  Shift+Enter or Alt+Enter inserts a newline.");
}
