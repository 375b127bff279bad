//! Message list widget for displaying the conversation

use crate::feedback::Reaction;
use crate::present::{Presentation, present};
use crate::theme::Theme;
use crate::widgets::markdown::{render_blocks, render_code, wrap_spans};
use crate::widgets::spinner::frame_at;
use rchat_core::Message;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use std::time::Instant;

/// Who a displayed entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    /// Local notes (errors, command output); never sent anywhere
    System,
}

/// A single entry in the chat pane
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    /// Text currently shown (a prefix of the reply while it is being revealed)
    pub content: String,
    /// Position in the conversation, for numbered references
    pub position: Option<usize>,
    /// Whether this is an error note
    pub is_error: bool,
    /// Whether more of the text is still to be revealed
    pub is_revealing: bool,
    /// Waiting for the reply
    pub is_pending: bool,
    pub reaction: Option<Reaction>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            position: None,
            is_error: false,
            is_revealing: false,
            is_pending: false,
            reaction: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system note
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create an error note
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::new(Role::System, content)
        }
    }

    /// Placeholder shown while the reply is awaited
    pub fn pending() -> Self {
        Self {
            is_pending: true,
            ..Self::new(Role::Assistant, "")
        }
    }

    /// Display entry for a conversation message at `position`
    pub fn from_message(message: &Message, position: usize) -> Self {
        let role = if message.is_user { Role::User } else { Role::Assistant };
        Self {
            position: Some(position),
            ..Self::new(role, message.text.clone())
        }
    }

    pub fn with_reaction(mut self, reaction: Option<Reaction>) -> Self {
        self.reaction = reaction;
        self
    }

    pub fn revealing(mut self, revealing: bool) -> Self {
        self.is_revealing = revealing;
        self
    }
}

/// Widget for displaying a list of chat messages
pub struct MessageList<'a> {
    messages: &'a [ChatMessage],
    theme: &'a Theme,
    scroll: usize,
    spinner_start: Instant,
}

impl<'a> MessageList<'a> {
    /// Create a new message list
    pub fn new(messages: &'a [ChatMessage], theme: &'a Theme) -> Self {
        Self {
            messages,
            theme,
            scroll: 0,
            spinner_start: Instant::now(),
        }
    }

    /// Set scroll offset
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    /// Animate the pending indicator relative to this instant
    pub fn spinner_start(mut self, start: Instant) -> Self {
        self.spinner_start = start;
        self
    }

    /// All lines of the list, wrapped to `width`
    pub fn lines(&self, width: usize) -> Vec<Line<'static>> {
        self.messages
            .iter()
            .flat_map(|msg| self.render_message(msg, width))
            .collect()
    }

    fn render_message(&self, msg: &ChatMessage, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let (label, style, prefix) = match msg.role {
            Role::User => ("You", self.theme.role_style(true), "▶ "),
            Role::Assistant => ("Assistant", self.theme.role_style(false), "◀ "),
            Role::System if msg.is_error => ("Error", self.theme.error_style(), "● "),
            Role::System => ("System", self.theme.dim_style(), "● "),
        };

        let mut header = vec![Span::styled(format!("{}{}", prefix, label), style)];
        if let Some(position) = msg.position {
            header.push(Span::styled(format!(" #{}", position + 1), self.theme.dim_style()));
        }
        if let Some(reaction) = msg.reaction {
            header.push(Span::raw(format!(" {}", reaction.icon())));
        }
        if msg.is_revealing {
            header.push(Span::styled(" ▌", style));
        }
        lines.push(Line::from(header));

        let content_width = width.saturating_sub(2);
        let body = if msg.is_pending {
            vec![Line::from(Span::styled(
                format!("{} thinking...", frame_at(self.spinner_start.elapsed())),
                self.theme.warning_style(),
            ))]
        } else if msg.role == Role::System {
            let style = if msg.is_error {
                self.theme.error_style()
            } else {
                self.theme.dim_style()
            };
            wrap_spans(vec![Span::styled(msg.content.clone(), style)], content_width)
        } else {
            let message = Message {
                text: msg.content.clone(),
                is_user: msg.role == Role::User,
            };
            match present(&message, self.theme.dark) {
                Presentation::Code { language, body, .. } => {
                    render_code(&language, &body, self.theme, content_width)
                }
                Presentation::Markdown(blocks) => render_blocks(&blocks, self.theme, content_width),
            }
        };

        for line in body {
            let mut indented = vec![Span::raw("  ")];
            indented.extend(line.spans);
            lines.push(Line::from(indented));
        }

        // Empty line between messages
        lines.push(Line::from(""));

        lines
    }
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let visible_lines: Vec<Line> = self
            .lines(area.width as usize)
            .into_iter()
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();

        Paragraph::new(visible_lines)
            .style(Style::default().remove_modifier(Modifier::empty()))
            .render(area, buf);
    }
}

/// Calculate total height of messages
pub fn calculate_message_height(messages: &[ChatMessage], theme: &Theme, width: usize) -> usize {
    MessageList::new(messages, theme).lines(width).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_headers_carry_number_and_reaction() {
        let theme = Theme::dark();
        let messages = vec![
            ChatMessage::from_message(&Message::user("hi"), 0),
            ChatMessage::from_message(&Message::assistant("hello"), 1)
                .with_reaction(Some(Reaction::Like)),
        ];
        let texts = text_of(&MessageList::new(&messages, &theme).lines(40));
        assert_eq!(texts[0], "▶ You #1");
        assert_eq!(texts[1], "  hi");
        assert_eq!(texts[3], "◀ Assistant #2 👍");
        assert_eq!(texts[4], "  hello");
    }

    #[test]
    fn test_fenced_reply_renders_as_code() {
        let theme = Theme::dark();
        let messages = vec![ChatMessage::assistant("```js\nconsole.log(1)\n```")];
        let texts = text_of(&MessageList::new(&messages, &theme).lines(60));
        assert_eq!(texts[1], "  ┌─ js");
        assert!(texts.iter().any(|t| t.contains("console.log(1)")));
    }

    #[test]
    fn test_pending_shows_thinking() {
        let theme = Theme::light();
        let messages = vec![ChatMessage::pending()];
        let texts = text_of(&MessageList::new(&messages, &theme).lines(40));
        assert!(texts[1].contains("thinking..."));
    }

    #[test]
    fn test_height_matches_lines() {
        let theme = Theme::dark();
        let messages = vec![
            ChatMessage::user("a fairly long question that will need to wrap"),
            ChatMessage::error("Service unavailable"),
        ];
        assert_eq!(
            calculate_message_height(&messages, &theme, 20),
            MessageList::new(&messages, &theme).lines(20).len()
        );
        assert!(calculate_message_height(&messages, &theme, 20) > 6);
    }
}
