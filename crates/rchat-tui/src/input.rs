//! Input handling

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};

/// Processed input action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Regular character input
    Char(char),
    /// Enter/submit
    Submit,
    /// Backspace
    Backspace,
    /// Delete
    Delete,
    /// Move cursor left
    Left,
    /// Move cursor right
    Right,
    /// Move cursor up
    Up,
    /// Move cursor down
    Down,
    /// Move to start of line
    Home,
    /// Move to end of line
    End,
    /// Page up
    PageUp,
    /// Page down
    PageDown,
    /// Tab (finish revealing replies)
    Tab,
    /// Escape
    Escape,
    /// Ctrl+C (interrupt)
    Interrupt,
    /// Ctrl+L (clear conversation)
    Clear,
    /// Ctrl+U (clear line)
    ClearLine,
    /// Ctrl+W (delete word)
    DeleteWord,
    /// Paste (from clipboard or bracketed paste)
    Paste(String),
    /// Ctrl+Y (copy last reply)
    CopyReply,
    /// Ctrl+B (show/hide history sidebar)
    ToggleSidebar,
    /// Ctrl+O (open history selector)
    HistorySelect,
    /// Ctrl+E (open edit selector)
    EditSelect,
    /// Ctrl+T (dark/light mode)
    ToggleTheme,
    /// Ctrl+R (speech input)
    Voice,
    /// Quit application
    Quit,
    /// Unknown/unhandled
    Unknown,
}

/// Convert a crossterm key event to an action
pub fn key_to_action(event: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = event;

    // Handle Ctrl combinations first
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Action::Interrupt,
            KeyCode::Char('l') => Action::Clear,
            KeyCode::Char('u') => Action::ClearLine,
            KeyCode::Char('w') => Action::DeleteWord,
            KeyCode::Char('y') => Action::CopyReply,
            KeyCode::Char('b') => Action::ToggleSidebar,
            KeyCode::Char('o') => Action::HistorySelect,
            KeyCode::Char('e') => Action::EditSelect,
            KeyCode::Char('t') => Action::ToggleTheme,
            KeyCode::Char('r') => Action::Voice,
            KeyCode::Char('q') => Action::Quit,
            _ => Action::Unknown,
        };
    }

    // Handle Alt combinations
    if modifiers.contains(KeyModifiers::ALT) {
        return Action::Unknown;
    }

    // Regular keys
    match code {
        KeyCode::Char(c) => Action::Char(c),
        KeyCode::Enter => Action::Submit,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::Delete,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Up => Action::Up,
        KeyCode::Down => Action::Down,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Tab => Action::Tab,
        KeyCode::Esc => Action::Escape,
        _ => Action::Unknown,
    }
}

/// Convert a crossterm event to an action
pub fn event_to_action(event: Event) -> Option<Action> {
    match event {
        Event::Key(key_event) => Some(key_to_action(key_event)),
        Event::Paste(text) => Some(Action::Paste(text)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_control_bindings() {
        assert_eq!(key_to_action(ctrl('b')), Action::ToggleSidebar);
        assert_eq!(key_to_action(ctrl('o')), Action::HistorySelect);
        assert_eq!(key_to_action(ctrl('e')), Action::EditSelect);
        assert_eq!(key_to_action(ctrl('t')), Action::ToggleTheme);
        assert_eq!(key_to_action(ctrl('r')), Action::Voice);
        assert_eq!(key_to_action(ctrl('y')), Action::CopyReply);
        assert_eq!(key_to_action(ctrl('c')), Action::Interrupt);
    }

    #[test]
    fn test_plain_keys() {
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)),
            Action::Char('x')
        );
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
            Action::Submit
        );
    }

    #[test]
    fn test_paste_event() {
        assert_eq!(
            event_to_action(Event::Paste("hi".into())),
            Some(Action::Paste("hi".into()))
        );
        assert_eq!(event_to_action(Event::FocusGained), None);
    }
}
