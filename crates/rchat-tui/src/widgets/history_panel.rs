//! Sidebar listing past prompts, newest first

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

pub struct HistoryPanel<'a> {
    entries: &'a [String],
    theme: &'a Theme,
}

impl<'a> HistoryPanel<'a> {
    pub fn new(entries: &'a [String], theme: &'a Theme) -> Self {
        Self { entries, theme }
    }

    /// One line per entry, numbered from 1 in storage order
    pub fn lines(&self, width: usize) -> Vec<Line<'static>> {
        if self.entries.is_empty() {
            return vec![Line::from(Span::styled("No history yet", self.theme.dim_style()))];
        }
        self.entries
            .iter()
            .enumerate()
            .rev()
            .map(|(i, entry)| {
                let number = format!("{:>3} ", i + 1);
                let room = width.saturating_sub(number.len());
                Line::from(vec![
                    Span::styled(number, self.theme.dim_style()),
                    Span::styled(clip(entry, room), self.theme.base_style()),
                ])
            })
            .collect()
    }
}

/// First line of `text`, cut to `width` columns with an ellipsis
fn clip(text: &str, width: usize) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    let mut out = String::new();
    let mut used = 0;
    for c in line.chars() {
        let cw = c.width().unwrap_or(0);
        if used + cw > width.saturating_sub(1) {
            out.push('…');
            return out;
        }
        out.push(c);
        used += cw;
    }
    out
}

impl Widget for HistoryPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" History ")
            .title_style(self.theme.accent_bold())
            .borders(Borders::ALL)
            .border_style(self.theme.border_style());
        let inner = block.inner(area);
        block.render(area, buf);

        Paragraph::new(self.lines(inner.width as usize)).render(inner, buf);
    }
}
