use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use windcode::commands::{assistant::AssistantSession, chat, settings, workspace};
use windcode::config::resolve_config;
use windcode::inference::InferenceClient;
use windcode::{init_tracing, AppContext};

/// WindCode: terminal AI pair programmer backed by a local OpenAI-compatible model.
#[derive(Parser)]
#[command(name = "windcode", version, about)]
struct Cli {
    /// Path to windcode.yaml (default: discovered from the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project id to open instead of the cached one
    #[arg(long, global = true)]
    project: Option<String>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Workspace view with the file tree; Ctrl+L opens the assistant (default)
    Shell,
    /// Tool-calling AI assistant
    Assistant,
    /// Echo chatbot
    Chat,
    /// Print the project's file tree
    Files,
    /// Print one project file
    Open { path: String },
    /// List models offered by the inference server
    Models,
    /// Show the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_path) = resolve_config(cli.config.as_deref())?;
    if let Err(e) = init_tracing(&config.logging, cli.verbose) {
        eprintln!("warning: file logging disabled: {e}");
    }
    tracing::info!(config_path = ?config_path, "configuration resolved");

    let command = cli.command.unwrap_or(Command::Shell);

    match &command {
        Command::Models => {
            let client = InferenceClient::from_config(&config.inference)
                .context("failed to build inference client")?;
            settings::show_models(&client).await;
            return Ok(());
        }
        Command::Config => {
            settings::show_config(&config, config_path.as_deref());
            return Ok(());
        }
        _ => {}
    }

    let ctx = AppContext::bootstrap(config, cli.project).await?;

    match command {
        Command::Shell => workspace::run_shell(&ctx).await?,
        Command::Assistant => {
            let mut session = AssistantSession::open(&ctx).await?;
            session.run(&ctx).await?;
        }
        Command::Chat => chat::run_chat(&ctx).await?,
        Command::Files => workspace::print_files(ctx.store.as_ref(), &ctx.project.id).await?,
        Command::Open { path } => {
            workspace::print_file(ctx.store.as_ref(), &ctx.project.id, &path).await?
        }
        Command::Models | Command::Config => {}
    }

    tracing::info!("windcode exiting");
    Ok(())
}
