//! Terminal key handling while a generation is running.

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use futures::StreamExt;
use polish_core::CancelHandle;
use std::io;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What a key press means during a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Cancel,
}

/// Reads terminal events asynchronously using crossterm's EventStream.
pub struct EventHandler {
    stream: EventStream,
}

impl EventHandler {
    pub fn new() -> Self {
        Self {
            stream: EventStream::new(),
        }
    }

    /// Read the next terminal event. Returns None if the stream ends.
    pub async fn next(&mut self) -> Option<Event> {
        self.stream.next().await.and_then(|r| r.ok())
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a key event received while `Loading`. Input is not accepted then, so
/// everything except the cancel keys is ignored.
pub fn map_generation_key(event: &KeyEvent) -> Option<Action> {
    if event.kind != KeyEventKind::Press {
        return None;
    }
    match (event.modifiers, event.code) {
        (_, KeyCode::Esc) => Some(Action::Cancel),
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(Action::Cancel),
        _ => None,
    }
}

/// Watches the keyboard for the duration of one generation and forwards
/// cancel keys to the session's [`CancelHandle`].
///
/// Puts the terminal in raw mode while it runs; [`KeyWatcher::stop`] restores
/// it.
pub struct KeyWatcher {
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl KeyWatcher {
    pub fn spawn(handle: CancelHandle) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let stop = CancellationToken::new();
        let stopped = stop.clone();

        let task = tokio::spawn(async move {
            let mut events = EventHandler::new();
            loop {
                let event = tokio::select! {
                    biased;
                    _ = stopped.cancelled() => break,
                    event = events.next() => event,
                };
                match event {
                    Some(Event::Key(key)) => {
                        if map_generation_key(&key) == Some(Action::Cancel) {
                            let cancelled = handle.cancel();
                            debug!(cancelled, "Cancel key pressed");
                        }
                    }
                    Some(_) => {}
                    None => break,
                }
            }
        });
        Ok(Self { stop, task })
    }

    /// Stop watching and restore the terminal.
    pub async fn stop(self) {
        self.stop.cancel();
        let _ = self.task.await;
        let _ = terminal::disable_raw_mode();
    }
}
