//! `windcode chat`: the echo chatbot REPL.

use std::time::Duration;

use colored::Colorize;
use rustyline::error::ReadlineError;

use super::build_editor;
use crate::agent_core::EchoChat;
use crate::AppContext;

pub async fn run_chat(ctx: &AppContext) -> anyhow::Result<()> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let mut chat = EchoChat::new(
        ctx.store.clone(),
        session_id,
        Duration::from_millis(ctx.config.echo.reply_delay_ms),
    );
    chat.load_history().await?;
    tracing::info!(session_id = %chat.session_id(), "echo chat started");

    let (mut rl, _) = build_editor()?;
    println!("{}", "WindCode chat".bold().green());
    println!("Type {} to exit.\n", "/quit".yellow());

    let prompt = format!("{}> ", "you".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "/quit" || trimmed == "/exit" {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                println!("{}", "typing...".dimmed());
                match chat.submit(trimmed).await {
                    Ok(Some(reply)) => println!("{} {}", "bot>".cyan().bold(), reply.content),
                    Ok(None) => {}
                    Err(e) => eprintln!("{}: {e}", "error".red()),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    Ok(())
}
