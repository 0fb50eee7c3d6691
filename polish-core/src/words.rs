//! Word reassembly: partial token text in, whole words out.
//!
//! Token boundaries from the model rarely line up with word boundaries. A
//! word is only shown once whitespace after it has been seen, so the display
//! never shows half a word that the next token would change.

/// Accumulates token text and releases whitespace-terminated words.
#[derive(Debug, Default, Clone)]
pub struct WordBuffer {
    pending: String,
}

impl WordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append token text and return the words it confirmed, in order.
    ///
    /// Everything before the last whitespace run is confirmed; the text after
    /// it (possibly empty) stays buffered.
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        self.pending.push_str(fragment);

        let Some((idx, ws)) = self
            .pending
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
        else {
            return Vec::new();
        };

        let tail = self.pending[idx + ws.len_utf8()..].to_string();
        let words = self.pending[..idx]
            .split_whitespace()
            .map(str::to_string)
            .collect();
        self.pending = tail;
        words
    }

    /// Release the trailing word at end of stream.
    ///
    /// Returns the trimmed remainder once; later calls return `None` until more
    /// text is pushed.
    pub fn flush(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let rest = rest.trim();
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }

    /// The unconfirmed text currently held.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// The confirmed words shown to the user for the current generation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DisplayedResult {
    words: Vec<String>,
}

impl DisplayedResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append confirmed words and return the text that was added to the
    /// rendered result: the words space-joined, with a leading space when the
    /// result already had content. Returns an empty string for no words.
    pub fn append<S: AsRef<str>>(&mut self, words: &[S]) -> String {
        let mut delta = String::new();
        for word in words {
            let word = word.as_ref();
            if word.is_empty() {
                continue;
            }
            if !self.words.is_empty() {
                delta.push(' ');
            }
            delta.push_str(word);
            self.words.push(word.to_string());
        }
        delta
    }

    /// The rendered result: words joined by single spaces.
    pub fn text(&self) -> String {
        self.words.join(" ")
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }
}
