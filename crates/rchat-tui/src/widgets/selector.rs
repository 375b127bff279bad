//! Selector popup for picking a history entry or a message to edit

use crate::Theme;
use crate::widgets::markdown::wrap_spans;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, HighlightSpacing, List, ListItem, ListState, Widget},
};
use unicode_width::UnicodeWidthStr;

/// Maximum width for selector popups
const MAX_POPUP_WIDTH: u16 = 80;

/// An item in the selector
#[derive(Debug, Clone)]
pub struct SelectorItem {
    /// Display label
    pub label: String,
    /// Optional description, shown dimmed after the label
    pub description: Option<String>,
    /// Whether this item is currently active
    pub is_current: bool,
}

impl SelectorItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
            is_current: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A popup selector over a list of items
pub struct Selector<'a> {
    title: String,
    items: &'a [SelectorItem],
    selected: usize,
    theme: &'a Theme,
}

impl<'a> Selector<'a> {
    /// Create a new selector
    pub fn new(title: impl Into<String>, items: &'a [SelectorItem], theme: &'a Theme) -> Self {
        let selected = items.iter().position(|item| item.is_current).unwrap_or(0);
        Self {
            title: title.into(),
            items,
            selected,
            theme,
        }
    }

    /// Set the selected index
    pub fn with_selected(mut self, index: usize) -> Self {
        self.selected = index.min(self.items.len().saturating_sub(1));
        self
    }

    fn popup_size(&self, area: Rect) -> (u16, u16) {
        let mut max_width = self.title.width() + 4;
        for item in self.items {
            let desc = item.description.as_deref().map_or(0, |d| d.width() + 3);
            max_width = max_width.max(item.label.width() + desc + 6);
        }
        let width = (max_width as u16).clamp(20, MAX_POPUP_WIDTH).min(area.width);
        let height = (self.items.len() as u16 + 2).min(20).min(area.height);
        (width, height)
    }

    fn list_item(&self, item: &SelectorItem, is_selected: bool, width: usize) -> ListItem<'static> {
        let prefix = if item.is_current { "● " } else { "  " };
        let style = if is_selected {
            Style::default()
                .bg(self.theme.accent)
                .fg(self.theme.bg)
                .add_modifier(Modifier::BOLD)
        } else if item.is_current {
            self.theme.accent_style()
        } else {
            self.theme.base_style()
        };

        let mut spans = vec![Span::styled(format!("{}{}", prefix, item.label), style)];
        if let Some(desc) = &item.description {
            spans.push(Span::styled(format!(" · {}", desc), self.theme.dim_style()));
        }
        // One row per item; overflow is cut at the popup edge
        let line = wrap_spans(spans, width.max(1))
            .into_iter()
            .next()
            .unwrap_or_default();
        ListItem::new(line)
    }

    /// Render the selector centered in the given area
    pub fn render_centered(&self, area: Rect, buf: &mut Buffer) {
        let (width, height) = self.popup_size(area);
        let x = area.x + (area.width.saturating_sub(width)) / 2;
        let y = area.y + (area.height.saturating_sub(height)) / 2;
        let popup_area = Rect::new(x, y, width, height);

        Clear.render(popup_area, buf);

        let block = Block::default()
            .title(format!(" {} ", self.title))
            .title_style(self.theme.accent_bold())
            .borders(Borders::ALL)
            .border_style(self.theme.accent_style());

        let inner_width = width.saturating_sub(4) as usize;
        let items: Vec<ListItem> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| self.list_item(item, i == self.selected, inner_width))
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_spacing(HighlightSpacing::Always);

        let mut state = ListState::default();
        state.select(Some(self.selected));

        ratatui::widgets::StatefulWidget::render(list, popup_area, buf, &mut state);
    }
}

/// State for the selector popup
#[derive(Debug, Default)]
pub struct SelectorState {
    /// Currently selected index
    pub selected: usize,
    /// Whether the selector is visible
    pub visible: bool,
}

impl SelectorState {
    /// Show the selector with `selected` highlighted
    pub fn show_at(&mut self, selected: usize) {
        self.selected = selected;
        self.visible = true;
    }

    /// Hide the selector
    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Move selection up
    pub fn up(&mut self, item_count: usize) {
        if item_count == 0 {
            return;
        }
        if self.selected > 0 {
            self.selected -= 1;
        } else {
            self.selected = item_count - 1;
        }
    }

    /// Move selection down
    pub fn down(&mut self, item_count: usize) {
        if item_count == 0 {
            return;
        }
        if self.selected < item_count - 1 {
            self.selected += 1;
        } else {
            self.selected = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_wraps_around() {
        let mut state = SelectorState::default();
        state.show_at(0);
        state.up(3);
        assert_eq!(state.selected, 2);
        state.down(3);
        assert_eq!(state.selected, 0);
        state.down(0);
        assert_eq!(state.selected, 0);
    }

    #[test]
    fn test_render_shows_items_and_title() {
        let theme = Theme::dark();
        let items = vec![
            SelectorItem::new("first"),
            SelectorItem::new("second").with_description("2"),
        ];
        let area = Rect::new(0, 0, 40, 10);
        let mut buf = Buffer::empty(area);
        Selector::new("History", &items, &theme)
            .with_selected(1)
            .render_centered(area, &mut buf);

        let screen: String = (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n");
        assert!(screen.contains("History"));
        assert!(screen.contains("first"));
        assert!(screen.contains("second"));
    }
}
