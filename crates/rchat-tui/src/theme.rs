//! Color theme support

use ratatui::style::{Color, Modifier, Style};

/// Color theme for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    /// Whether this is the dark variant
    pub dark: bool,
    /// Background color
    pub bg: Color,
    /// Primary text color
    pub fg: Color,
    /// Dimmed/secondary text
    pub dim: Color,
    /// Accent color (highlights, prompts)
    pub accent: Color,
    /// Error color
    pub error: Color,
    /// Success color
    pub success: Color,
    /// Warning color
    pub warning: Color,
    /// Border color
    pub border: Color,
    /// Selection/highlight background
    pub selection_bg: Color,
    /// Code/preformatted text color
    pub code: Color,
    /// Link color
    pub link: Color,
    /// Header color for the user's messages
    pub user: Color,
    /// Header color for assistant replies
    pub assistant: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Theme for a display mode
    pub fn for_mode(dark_mode: bool) -> Self {
        if dark_mode { Self::dark() } else { Self::light() }
    }

    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            dark: true,
            bg: Color::Reset,
            fg: Color::White,
            dim: Color::DarkGray,
            accent: Color::Cyan,
            error: Color::Red,
            success: Color::Green,
            warning: Color::Yellow,
            border: Color::DarkGray,
            selection_bg: Color::DarkGray,
            code: Color::Magenta,
            link: Color::LightBlue,
            user: Color::Cyan,
            assistant: Color::Green,
        }
    }

    /// Light theme
    pub fn light() -> Self {
        Self {
            dark: false,
            bg: Color::White,
            fg: Color::Black,
            dim: Color::Gray,
            accent: Color::Blue,
            error: Color::Red,
            success: Color::Rgb(0, 128, 0),
            warning: Color::Rgb(180, 120, 0),
            border: Color::Gray,
            selection_bg: Color::LightBlue,
            code: Color::Magenta,
            link: Color::Blue,
            user: Color::Blue,
            assistant: Color::Rgb(0, 128, 0),
        }
    }

    /// Get base style
    pub fn base_style(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    /// Get dimmed style
    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    /// Get accent style
    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    /// Get bold accent style
    pub fn accent_bold(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Get error style
    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    /// Get warning style
    pub fn warning_style(&self) -> Style {
        Style::default().fg(self.warning)
    }

    /// Get code/preformatted style
    pub fn code_style(&self) -> Style {
        Style::default().fg(self.code)
    }

    /// Get link style
    pub fn link_style(&self) -> Style {
        Style::default()
            .fg(self.link)
            .add_modifier(Modifier::UNDERLINED)
    }

    /// Get border style
    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    /// Header style for a message author
    pub fn role_style(&self, is_user: bool) -> Style {
        let color = if is_user { self.user } else { self.assistant };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }
}
