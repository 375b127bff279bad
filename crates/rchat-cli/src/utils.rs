//! Shared utilities

use rchat_core::Message;
use rchat_tui::{Presentation, Theme, present, widgets::markdown};

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Render a message the way the TUI lays it out, without colors
pub fn render_plain(message: &Message, width: usize) -> String {
    let theme = Theme::default();
    let lines = match present(message, theme.dark) {
        Presentation::Code { language, body, .. } => {
            markdown::render_code(&language, &body, &theme, width)
        }
        Presentation::Markdown(blocks) => markdown::render_blocks(&blocks, &theme, width),
    };
    lines
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|s| s.content.as_ref())
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Terminal width for plain output
pub fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(w, _)| w as usize)
        .unwrap_or(80)
        .max(20)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn test_render_plain_markdown() {
        let text = render_plain(&Message::assistant("**Rust** is\n\n- fast\n- safe"), 40);
        assert_eq!(text, "Rust is\n\n• fast\n• safe");
    }

    #[test]
    fn test_render_plain_code() {
        let text = render_plain(&Message::assistant("```python\nprint(1)\n```"), 40);
        assert!(text.starts_with("┌─ python"));
        assert!(text.contains("│ print(1)"));
    }
}
