//! Single-shot and interactive modes.

use crate::event::KeyWatcher;
use crate::repl_input::{InputHistory, ReplInput, wait_for_key};
use crate::slash::CommandRegistry;
use polish_core::{
    GenerateError, GenerationCallback, GenerationOutcome, LifecycleState, OllamaBackend,
    PolishConfig, PromptSession, config_exists,
};
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

/// Key hint in the status line of single-shot mode.
const SINGLE_SHOT_HINT: &str = "Ctrl-C to cancel";
/// Key hint in the status line of interactive mode.
const INTERACTIVE_HINT: &str = "Esc to cancel";

/// Prints the stream to stdout as words arrive.
///
/// Status lines and notices go to stderr so piped output holds only the
/// result. Output uses `\r\n` because the terminal may be in raw mode while
/// a generation runs.
pub(crate) struct CliCallback {
    color: bool,
    cancel_hint: &'static str,
}

impl CliCallback {
    pub(crate) fn new(color: bool, cancel_hint: &'static str) -> Self {
        Self { color, cancel_hint }
    }

    fn status_line(&self) -> String {
        self.paint("90", &format!("  polishing... ({})", self.cancel_hint))
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

#[async_trait::async_trait]
impl GenerationCallback for CliCallback {
    async fn on_state_change(&self, state: LifecycleState) {
        if state.is_loading() {
            let mut err = io::stderr();
            let _ = write!(err, "{}\r\n", self.status_line());
            let _ = err.flush();
        }
    }

    async fn on_progress(&self, delta: &str, _text: &str) {
        print!("{}", delta);
        let _ = io::stdout().flush();
    }

    async fn on_complete(&self, _text: &str) {
        print!("\r\n");
        let _ = io::stdout().flush();
    }

    async fn on_error(&self, error: &GenerateError) {
        let mut out = io::stderr();
        let _ = write!(out, "\r\n{}\r\n", self.paint("31", error.user_message()));
        if !matches!(error, GenerateError::Validation { .. }) {
            let _ = write!(out, "{}\r\n", self.paint("90", &format!("  ({})", error)));
        }
        let _ = out.flush();
    }

    async fn on_cancelled(&self) {
        let _ = io::stdout().flush();
        let mut err = io::stderr();
        let _ = write!(err, "\r\n{}\r\n", self.paint("90", "  [cancelled]"));
        let _ = err.flush();
    }
}

/// Copy text to the system clipboard.
pub(crate) fn copy_to_clipboard(text: &str) -> Result<(), arboard::Error> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text)
}

fn create_session(
    config: &PolishConfig,
    cancel_hint: &'static str,
) -> anyhow::Result<PromptSession> {
    let backend = Arc::new(OllamaBackend::new(&config.server)?);
    let callback = Arc::new(CliCallback::new(config.ui.color, cancel_hint));
    Ok(PromptSession::new(
        backend,
        config.generation.clone(),
        callback,
    ))
}

/// Polish one piece of text and exit.
///
/// Ctrl-C cancels the running generation. The exit code is 1 on failure and
/// 130 on cancellation.
pub async fn run_single_task(
    text: &str,
    config: PolishConfig,
    copy: bool,
) -> anyhow::Result<ExitCode> {
    let mut session = create_session(&config, SINGLE_SHOT_HINT)?;

    let handle = session.cancel_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let result = session.submit(text).await;
    interrupt.abort();

    match result {
        Ok(GenerationOutcome::Completed { text }) => {
            if (copy || config.ui.copy_on_complete) && !text.is_empty() {
                if let Err(e) = copy_to_clipboard(&text) {
                    eprintln!("Clipboard unavailable: {}", e);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Ok(GenerationOutcome::Cancelled) => Ok(ExitCode::from(130)),
        // The notice has already been printed by the callback.
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

/// What the loop does after a slash command.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum CommandFlow {
    Continue,
    Quit,
}

/// Run a `/command` line against the session.
pub(crate) fn handle_command(
    line: &str,
    registry: &CommandRegistry,
    session: &mut PromptSession,
) -> CommandFlow {
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    };

    let Some(info) = registry.lookup(cmd) else {
        match registry.suggest(cmd) {
            Some(suggestion) => {
                println!("Unknown command: {}. Did you mean {}?", cmd, suggestion)
            }
            None => println!("Unknown command: {}. Type /help for commands.", cmd),
        }
        return CommandFlow::Continue;
    };

    match info.name {
        "/quit" => {
            println!("Goodbye!");
            return CommandFlow::Quit;
        }
        "/help" => println!("{}", registry.help_text()),
        "/clear" => {
            print!("\x1b[2J\x1b[H");
            let _ = io::stdout().flush();
        }
        "/cancel" => {
            session.reset();
            println!("Result cleared.");
        }
        "/copy" => {
            let text = session.result_text();
            if text.is_empty() {
                println!("Nothing to copy yet.");
            } else {
                match copy_to_clipboard(&text) {
                    Ok(()) => println!("[Copied to clipboard]"),
                    Err(e) => println!("[Clipboard unavailable: {}]", e),
                }
            }
        }
        "/model" => {
            if arg.is_empty() {
                println!("Model: {}", session.config().model);
            } else {
                session.set_model(arg);
                tracing::info!(model = arg, "Switched model");
                println!("Model set to {}", arg);
            }
        }
        other => tracing::debug!(command = other, "Command has no handler"),
    }
    CommandFlow::Continue
}

/// Interactive prompt loop.
pub async fn run_interactive(config: PolishConfig, workspace: &Path) -> anyhow::Result<()> {
    let color = config.ui.color;
    if color {
        println!("\x1b[1;32m  polish\x1b[0m \x1b[90mv{}\x1b[0m", env!("CARGO_PKG_VERSION"));
    } else {
        println!("  polish v{}", env!("CARGO_PKG_VERSION"));
    }
    println!(
        "  Model: {} | Server: {}",
        config.generation.model,
        config.server.endpoint()
    );
    if !config_exists(Some(workspace)) {
        println!("  No config file found. Run `polish config init` to create one.");
    }
    println!("  Type text to polish, /help for commands, /quit to exit\n");

    let registry = CommandRegistry::with_defaults();
    let history = if config.ui.history {
        InputHistory::new(workspace)
    } else {
        InputHistory::in_memory()
    };
    let mut input = ReplInput::new(history, color);
    let mut session = create_session(&config, INTERACTIVE_HINT)?;

    loop {
        let Some(line) = input.read_line(&registry)? else {
            println!("Goodbye!");
            break;
        };

        if line.starts_with('/') {
            if handle_command(&line, &registry, &mut session) == CommandFlow::Quit {
                break;
            }
            continue;
        }

        let watcher = KeyWatcher::spawn(session.cancel_handle())?;
        let result = session.submit(&line).await;
        watcher.stop().await;

        match result {
            Ok(GenerationOutcome::Completed { text }) => {
                if config.ui.copy_on_complete && !text.is_empty() {
                    if let Err(e) = copy_to_clipboard(&text) {
                        println!("[Clipboard unavailable: {}]", e);
                    }
                }
            }
            Ok(GenerationOutcome::Cancelled) => {}
            Err(_) => {
                println!("  Press any key to continue.");
                wait_for_key()?;
            }
        }
        println!();
    }
    Ok(())
}
