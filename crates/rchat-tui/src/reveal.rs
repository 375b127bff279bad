//! Paced reveal of assistant replies

use std::time::{Duration, Instant};

/// Time between revealing consecutive characters
pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(20);

/// Reveals a text as growing prefixes, one character per interval.
///
/// Progress is computed from elapsed time, so a late tick catches up in one
/// step instead of skipping characters.
#[derive(Debug, Clone)]
pub struct RevealPacer {
    text: String,
    total: usize,
    /// Characters already shown when the current run started
    base: usize,
    visible: usize,
    interval: Duration,
    started: Instant,
}

impl RevealPacer {
    /// Start revealing `text` from its first character
    pub fn new(text: impl Into<String>, interval: Duration) -> Self {
        Self::new_at(text, interval, Instant::now())
    }

    /// Start revealing `text` at a given instant
    pub fn new_at(text: impl Into<String>, interval: Duration, now: Instant) -> Self {
        let text = text.into();
        let total = text.chars().count();
        let mut pacer = Self {
            text,
            total,
            base: 0,
            visible: 0,
            interval,
            started: now,
        };
        if interval.is_zero() {
            pacer.skip();
        }
        pacer
    }

    /// A pacer that shows everything at once (user messages)
    pub fn complete(text: impl Into<String>) -> Self {
        let mut pacer = Self::new_at(text, DEFAULT_REVEAL_INTERVAL, Instant::now());
        pacer.skip();
        pacer
    }

    /// Point the pacer at new text.
    ///
    /// Text that extends the current text keeps the progress made so far;
    /// any other change restarts the reveal from the beginning.
    pub fn set_text(&mut self, text: &str, now: Instant) {
        if text == self.text {
            return;
        }
        let extends = text.starts_with(self.text.as_str());
        self.text = text.to_string();
        self.total = self.text.chars().count();
        self.base = if extends { self.visible } else { 0 };
        self.visible = self.base;
        self.started = now;
        if self.interval.is_zero() {
            self.skip();
        }
    }

    /// Advance to `now`. Returns `true` when more text became visible.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.is_complete() {
            return false;
        }
        let elapsed = now.saturating_duration_since(self.started);
        let steps = (elapsed.as_nanos() / self.interval.as_nanos().max(1)) as usize;
        let visible = self.base.saturating_add(steps).min(self.total);
        let advanced = visible > self.visible;
        self.visible = visible;
        advanced
    }

    /// Show the whole text now
    pub fn skip(&mut self) {
        self.visible = self.total;
    }

    pub fn is_complete(&self) -> bool {
        self.visible >= self.total
    }

    /// Number of characters currently shown
    pub fn visible_chars(&self) -> usize {
        self.visible
    }

    /// The full text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The currently shown prefix
    pub fn visible_text(&self) -> &str {
        match self.text.char_indices().nth(self.visible) {
            Some((byte, _)) => &self.text[..byte],
            None => &self.text,
        }
    }
}
