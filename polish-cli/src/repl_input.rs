//! Prompt line editor for interactive mode.
//!
//! A small crossterm-based input handler:
//! - Up/Down arrow history navigation with draft preservation
//! - ghost-text completion for `/` commands, accepted with Tab or Right
//! - Ctrl-C clears the line, Ctrl-D on an empty line is EOF
//! - persistent history at `.polish/history` in the workspace

use crate::slash::CommandRegistry;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const MAX_HISTORY: usize = 500;

/// Persistent input history.
pub struct InputHistory {
    entries: Vec<String>,
    index: Option<usize>,
    draft: Option<String>,
    /// `None` keeps history in memory only.
    file_path: Option<PathBuf>,
}

impl InputHistory {
    /// Load history from the workspace's `.polish/history`.
    pub fn new(workspace: &Path) -> Self {
        let file_path = workspace.join(".polish").join("history");
        let entries = std::fs::read_to_string(&file_path)
            .unwrap_or_default()
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            entries,
            index: None,
            draft: None,
            file_path: Some(file_path),
        }
    }

    /// History that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            entries: Vec::new(),
            index: None,
            draft: None,
            file_path: None,
        }
    }

    fn save(&self) {
        let Some(path) = &self.file_path else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let content: String = self.entries.iter().map(|e| format!("{e}\n")).collect();
        if let Err(e) = std::fs::write(path, content) {
            tracing::debug!(path = %path.display(), error = %e, "Failed to save history");
        }
    }

    /// Add an entry, skipping blanks and consecutive duplicates.
    ///
    /// Multi-line entries are stored on one line with the newlines replaced.
    pub fn push(&mut self, entry: &str) {
        let entry = entry.trim().replace('\n', " ");
        if entry.is_empty() {
            return;
        }
        if self.entries.last() == Some(&entry) {
            self.reset_navigation();
            return;
        }
        self.entries.push(entry);
        if self.entries.len() > MAX_HISTORY {
            let excess = self.entries.len() - MAX_HISTORY;
            self.entries.drain(..excess);
        }
        self.save();
        self.reset_navigation();
    }

    /// Step to an older entry, remembering the current draft on the first step.
    pub fn navigate_up(&mut self, current: &str) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let next = match self.index {
            None => {
                self.draft = Some(current.to_string());
                self.entries.len() - 1
            }
            Some(idx) => idx.saturating_sub(1),
        };
        self.index = Some(next);
        Some(&self.entries[next])
    }

    /// Step to a newer entry; past the newest, the draft comes back.
    pub fn navigate_down(&mut self) -> Option<String> {
        let idx = self.index?;
        if idx + 1 >= self.entries.len() {
            self.index = None;
            Some(self.draft.take().unwrap_or_default())
        } else {
            self.index = Some(idx + 1);
            Some(self.entries[idx + 1].clone())
        }
    }

    pub fn reset_navigation(&mut self) {
        self.index = None;
        self.draft = None;
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// Text being edited, with a cursor counted in chars.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    text: String,
    cursor: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars() {
            self.insert(c);
        }
    }

    /// Delete the char before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.text.remove(at);
    }

    /// Delete the char under the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_len());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.char_len();
    }

    /// Replace the whole text and put the cursor at the end.
    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.end();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

/// The untyped rest of the first command completing `input`, if any.
///
/// Only offered while the input is a lone `/word` and the match is longer.
pub fn ghost_completion<'a>(input: &str, registry: &'a CommandRegistry) -> Option<&'a str> {
    if !input.starts_with('/') || input.contains(char::is_whitespace) {
        return None;
    }
    registry
        .completions(input)
        .into_iter()
        .find(|name| name.len() > input.len())
        .map(|name| &name[input.len()..])
}

/// Interactive prompt input.
pub struct ReplInput {
    history: InputHistory,
    color: bool,
}

impl ReplInput {
    pub fn new(history: InputHistory, color: bool) -> Self {
        Self { history, color }
    }

    /// Read one line. Returns `Some(line)` on Enter and `None` on Ctrl-D with
    /// an empty line. Raw mode is enabled only while reading.
    pub fn read_line(&mut self, registry: &CommandRegistry) -> io::Result<Option<String>> {
        let mut line = LineBuffer::new();
        self.redraw(&line, registry)?;

        terminal::enable_raw_mode()?;
        let _ = crossterm::execute!(io::stdout(), event::EnableBracketedPaste);
        let result = self.read_line_raw(&mut line, registry);
        let _ = crossterm::execute!(io::stdout(), event::DisableBracketedPaste);
        terminal::disable_raw_mode()?;

        print!("\r\n");
        io::stdout().flush()?;
        result
    }

    fn read_line_raw(
        &mut self,
        line: &mut LineBuffer,
        registry: &CommandRegistry,
    ) -> io::Result<Option<String>> {
        loop {
            let (code, modifiers) = match event::read()? {
                Event::Key(KeyEvent {
                    code,
                    modifiers,
                    kind: KeyEventKind::Press,
                    ..
                }) => (code, modifiers),
                Event::Paste(text) => {
                    line.insert_str(&text);
                    self.redraw(line, registry)?;
                    continue;
                }
                _ => continue,
            };

            match (code, modifiers) {
                (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                    line.clear();
                    self.history.reset_navigation();
                }
                (KeyCode::Char('d'), KeyModifiers::CONTROL) => {
                    if line.is_empty() {
                        return Ok(None);
                    }
                    line.delete();
                }
                (KeyCode::Enter, _) => {
                    let text = line.as_str().trim().to_string();
                    self.history.push(&text);
                    self.redraw_plain(line)?;
                    return Ok(Some(text));
                }
                (KeyCode::Tab, _) => {
                    if let Some(rest) = ghost_completion(line.as_str(), registry) {
                        line.end();
                        line.insert_str(rest);
                    }
                }
                (KeyCode::Right, _) => {
                    match ghost_completion(line.as_str(), registry) {
                        Some(rest) if line.cursor() == line.as_str().chars().count() => {
                            line.insert_str(rest);
                        }
                        _ => line.right(),
                    }
                }
                (KeyCode::Left, _) => line.left(),
                (KeyCode::Home, _) => line.home(),
                (KeyCode::End, _) => line.end(),
                (KeyCode::Backspace, _) => line.backspace(),
                (KeyCode::Delete, _) => line.delete(),
                (KeyCode::Up, _) => {
                    if let Some(entry) = self.history.navigate_up(line.as_str()) {
                        let entry = entry.to_string();
                        line.set(&entry);
                    }
                }
                (KeyCode::Down, _) => {
                    if let Some(entry) = self.history.navigate_down() {
                        line.set(&entry);
                    }
                }
                (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
                    line.insert(c);
                    self.history.reset_navigation();
                }
                _ => continue,
            }
            self.redraw(line, registry)?;
        }
    }

    fn prompt(&self) -> &'static str {
        if self.color { "\x1b[1;34m> \x1b[0m" } else { "> " }
    }

    /// Redraw the line with ghost completion text.
    fn redraw(&self, line: &LineBuffer, registry: &CommandRegistry) -> io::Result<()> {
        let mut stdout = io::stdout();
        write!(stdout, "\r\x1b[2K{}{}", self.prompt(), line.as_str())?;

        let mut trailing = line.as_str().chars().count() - line.cursor();
        if let Some(rest) = ghost_completion(line.as_str(), registry) {
            if self.color {
                write!(stdout, "\x1b[90m{rest}\x1b[0m")?;
            } else {
                write!(stdout, "{rest}")?;
            }
            trailing += rest.chars().count();
        }
        if trailing > 0 {
            write!(stdout, "{}", cursor::MoveLeft(trailing as u16))?;
        }
        stdout.flush()
    }

    /// Redraw without ghost text before leaving the line.
    fn redraw_plain(&self, line: &LineBuffer) -> io::Result<()> {
        let mut stdout = io::stdout();
        write!(stdout, "\r\x1b[2K{}{}", self.prompt(), line.as_str())?;
        stdout.flush()
    }
}

/// Block until any key is pressed. Used to acknowledge notices.
pub fn wait_for_key() -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let result = loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => break Ok(()),
            Ok(_) => continue,
            Err(e) => break Err(e),
        }
    };
    terminal::disable_raw_mode()?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_history_dedups_consecutive() {
        let mut history = InputHistory::in_memory();
        history.push("hello");
        history.push("  hello ");
        history.push("");
        history.push("world");
        history.push("hello");
        assert_eq!(history.entries(), ["hello", "world", "hello"]);
    }

    #[test]
    fn test_history_navigation_restores_draft() {
        let mut history = InputHistory::in_memory();
        history.push("first");
        history.push("second");

        assert_eq!(history.navigate_up("draft"), Some("second"));
        assert_eq!(history.navigate_up("ignored"), Some("first"));
        assert_eq!(history.navigate_up("ignored"), Some("first"));
        assert_eq!(history.navigate_down().as_deref(), Some("second"));
        assert_eq!(history.navigate_down().as_deref(), Some("draft"));
        assert_eq!(history.navigate_down(), None);
    }

    #[test]
    fn test_history_is_capped() {
        let mut history = InputHistory::in_memory();
        for i in 0..(MAX_HISTORY + 10) {
            history.push(&format!("entry {i}"));
        }
        assert_eq!(history.entries().len(), MAX_HISTORY);
        assert_eq!(history.entries()[0], "entry 10");
    }

    #[test]
    fn test_history_persists_in_workspace() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut history = InputHistory::new(dir.path());
        history.push("make this nicer");
        history.push("multi\nline");

        let reloaded = InputHistory::new(dir.path());
        assert_eq!(reloaded.entries(), ["make this nicer", "multi line"]);
        assert!(dir.path().join(".polish").join("history").exists());
    }

    #[test]
    fn test_line_buffer_multibyte_editing() {
        let mut line = LineBuffer::new();
        line.insert_str("grüß");
        assert_eq!(line.cursor(), 4);
        line.left();
        line.backspace();
        assert_eq!(line.as_str(), "grß");
        line.insert('u');
        line.insert('e');
        assert_eq!(line.as_str(), "grueß");
        line.home();
        line.delete();
        assert_eq!(line.as_str(), "rueß");
        line.end();
        line.right();
        assert_eq!(line.cursor(), 4);
    }

    #[test]
    fn test_line_buffer_set_and_clear() {
        let mut line = LineBuffer::new();
        line.set("résumé");
        assert_eq!(line.cursor(), 6);
        line.clear();
        assert!(line.is_empty());
        assert_eq!(line.cursor(), 0);
    }

    #[test]
    fn test_ghost_completion() {
        let registry = CommandRegistry::with_defaults();
        assert_eq!(ghost_completion("/co", &registry), Some("py"));
        assert_eq!(ghost_completion("/mo", &registry), Some("del"));
        assert_eq!(ghost_completion("/copy", &registry), None);
        assert_eq!(ghost_completion("/model x", &registry), None);
        assert_eq!(ghost_completion("hello", &registry), None);
        assert_eq!(ghost_completion("/zz", &registry), None);
    }
}
