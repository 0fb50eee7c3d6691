//! Polish CLI: rewrite text with a local model, streamed word by word.
//!
//! Provides both single-shot and interactive modes.

mod commands;
mod event;
mod repl;
mod repl_input;
mod slash;

use clap::Parser;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Polish: friendly rewrites from a local Ollama model
#[derive(Parser, Debug)]
#[command(name = "polish", version, about, long_about = None)]
struct Cli {
    /// Text to polish ("-" reads stdin; starts interactive mode if omitted)
    text: Option<String>,

    /// Model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Server base URL, e.g. http://localhost:11434
    #[arg(short, long)]
    url: Option<String>,

    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Copy the result to the clipboard when done
    #[arg(long)]
    copy: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default .polish/config.toml into the workspace
    Init,
    /// Print the effective configuration
    Show,
}

fn stderr_filter(verbose: u8, quiet: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Human-readable layer for stderr
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(stderr_filter(cli.verbose, cli.quiet)));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "polish", "polish")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "polish.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if let Some(command) = cli.command {
        commands::handle_command(command, &workspace, cli.config.as_deref()).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = polish_core::load_config(Some(&workspace), cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // CLI overrides
    if let Some(model) = &cli.model {
        config.generation.model = model.clone();
    }
    if let Some(url) = &cli.url {
        config.server.base_url = url.clone();
    }
    for warning in config.validate() {
        tracing::warn!("Config: {}", warning);
    }

    let piped = !std::io::stdin().is_terminal();
    match cli.text.as_deref() {
        Some("-") => {
            let text = read_stdin()?;
            repl::run_single_task(&text, config, cli.copy).await
        }
        Some(text) => repl::run_single_task(text, config, cli.copy).await,
        None if piped => {
            let text = read_stdin()?;
            repl::run_single_task(&text, config, cli.copy).await
        }
        None => {
            repl::run_interactive(config, &workspace).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_stdin() -> anyhow::Result<String> {
    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;
    Ok(text)
}
