//! TUI implementation for rchat

use tokio::sync::mpsc;

use crate::commands::{Command, HistoryCommand, help_message, parse_command, reply_target};
use crossterm::event::{Event, EventStream, MouseEventKind};
use futures::StreamExt;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use rchat_core::{ChatSession, ConversationEvent, Error, Message, SpeechError};
use rchat_tui::{
    Feedback, Reaction, RevealPacer, Theme,
    input::{Action, key_to_action},
    widgets::{
        ChatMessage, HistoryPanel, InputBox, MessageList, Selector, SelectorItem, SelectorState,
        Spinner, calculate_message_height,
    },
};
use std::collections::HashMap;
use std::future::Future;
use std::io::{self, Stdout};
use std::pin::Pin;
use std::time::{Duration, Instant};

const SIDEBAR_WIDTH: u16 = 32;

/// Messages sent from UI to the session handler
#[derive(Debug, PartialEq)]
pub enum UiMessage {
    /// User submitted a query
    Submit(String),
    /// User finished editing an earlier message
    Edit { index: usize, text: String },
    /// Slash command
    Command(String),
    /// Start speech capture
    Voice,
    /// Clear the conversation
    Clear,
    /// Remove a history entry
    DeleteHistory(usize),
    /// User requested quit
    Quit,
}

/// Work that waits on the gateway or the recognizer
#[derive(Debug)]
enum PendingOp {
    Submit(String),
    Edit { index: usize, text: String },
    Voice,
}

enum OpOutcome {
    Replied,
    Transcript(String),
    Failed(Error),
}

/// Settings the TUI starts with
#[derive(Debug, Clone)]
pub struct UiSettings {
    pub model: String,
    pub dark_mode: bool,
    pub reveal_interval: Duration,
}

/// TUI application state
pub struct TuiState {
    /// Snapshot of the conversation
    messages: Vec<Message>,
    /// Snapshot of the search history
    history: Vec<String>,
    /// Local notes, each shown before the message at its anchor position
    notes: Vec<(usize, ChatMessage)>,
    /// Reveal progress of assistant replies by position
    pacers: HashMap<usize, RevealPacer>,
    feedback: Feedback,
    /// Input box
    input: InputBox,
    /// Current scroll position
    scroll: usize,
    /// Keep the view pinned to the newest line
    follow: bool,
    /// Whether a reply is awaited
    is_thinking: bool,
    /// Whether speech capture is running
    is_listening: bool,
    /// Where the awaited reply will land (`None` means at the end)
    pending_at: Option<usize>,
    /// User message being rewritten through the input box
    editing: Option<usize>,
    /// Current status message
    status: String,
    /// Theme
    theme: Theme,
    model: String,
    reveal_interval: Duration,
    show_sidebar: bool,
    history_selector: SelectorState,
    edit_selector: SelectorState,
    /// Channel to send messages to the session handler
    ui_tx: mpsc::Sender<UiMessage>,
    /// Spinner start time for animation
    spinner_start: Instant,
}

impl TuiState {
    pub fn new(settings: UiSettings, ui_tx: mpsc::Sender<UiMessage>) -> Self {
        let mut input = InputBox::new().with_placeholder("Ask anything...");
        input.set_focused(true);

        Self {
            messages: vec![],
            history: vec![],
            notes: vec![],
            pacers: HashMap::new(),
            feedback: Feedback::new(),
            input,
            scroll: 0,
            follow: true,
            is_thinking: false,
            is_listening: false,
            pending_at: None,
            editing: None,
            status: "Ready".to_string(),
            theme: Theme::for_mode(settings.dark_mode),
            model: settings.model,
            reveal_interval: settings.reveal_interval,
            show_sidebar: false,
            history_selector: SelectorState::default(),
            edit_selector: SelectorState::default(),
            ui_tx,
            spinner_start: Instant::now(),
        }
    }

    /// Refresh snapshots from the session
    fn sync(&mut self, session: &ChatSession) {
        self.messages = session.conversation().messages();
        self.history = session.history();
        self.is_thinking = session.conversation().is_thinking();
        self.is_listening = session.speech().is_listening();
        self.update_input_lock();
    }

    fn update_input_lock(&mut self) {
        let hint = if self.is_thinking {
            Some("Waiting for the reply...".to_string())
        } else if self.is_listening {
            Some("Listening...".to_string())
        } else {
            None
        };
        self.input.set_disabled(hint);
    }

    /// Handle conversation events
    pub fn handle_conversation_event(&mut self, event: ConversationEvent) {
        match event {
            ConversationEvent::ThinkingChanged { thinking } => {
                self.is_thinking = thinking;
                if thinking {
                    self.spinner_start = Instant::now();
                    self.status = "Thinking...".to_string();
                }
                self.update_input_lock();
            }
            ConversationEvent::MessageAppended { index, message }
            | ConversationEvent::MessageReplaced { index, message }
                if !message.is_user =>
            {
                self.pacers
                    .insert(index, RevealPacer::new(message.text, self.reveal_interval));
                self.feedback.reset(index);
                if self.pending_at.is_none() {
                    self.scroll_to_bottom();
                }
            }
            ConversationEvent::MessageInserted { index, message } => {
                self.shift_from(index);
                if !message.is_user {
                    self.pacers
                        .insert(index, RevealPacer::new(message.text, self.reveal_interval));
                }
            }
            ConversationEvent::MessageAppended { .. } => self.scroll_to_bottom(),
            ConversationEvent::MessageEdited { .. } | ConversationEvent::MessageReplaced { .. } => {}
            ConversationEvent::Cleared => {
                self.pacers.clear();
                self.feedback.clear();
                self.notes.clear();
                self.scroll_to_bottom();
            }
            ConversationEvent::RequestFailed { message } => {
                self.status = format!("Error: {}", message);
            }
        }
    }

    /// Move position-keyed state at or after `index` down one slot
    fn shift_from(&mut self, index: usize) {
        self.pacers = self
            .pacers
            .drain()
            .map(|(i, p)| if i >= index { (i + 1, p) } else { (i, p) })
            .collect();
        self.feedback.shift_from(index);
        for (anchor, _) in &mut self.notes {
            if *anchor >= index {
                *anchor += 1;
            }
        }
    }

    fn begin(&mut self, op: &PendingOp) {
        self.spinner_start = Instant::now();
        match op {
            PendingOp::Submit(_) => {
                self.pending_at = None;
                self.scroll_to_bottom();
            }
            PendingOp::Edit { index, .. } => {
                self.pending_at = Some(index + 1);
                self.status = format!("Regenerating reply to message {}...", index + 1);
            }
            PendingOp::Voice => {
                self.is_listening = true;
                self.status = "Listening...".to_string();
                self.update_input_lock();
            }
        }
    }

    fn finish(&mut self, outcome: Option<OpOutcome>) {
        self.pending_at = None;
        self.is_listening = false;
        match outcome {
            Some(OpOutcome::Replied) => self.status = "Ready".to_string(),
            Some(OpOutcome::Transcript(text)) => {
                self.input.set_disabled(None);
                self.input.set_content(text);
                self.status = "Voice input captured (Enter to send)".to_string();
            }
            Some(OpOutcome::Failed(e)) => self.show_error(e),
            None => {
                self.show_note(ChatMessage::system("Request cancelled."));
                self.status = "Cancelled".to_string();
            }
        }
        self.update_input_lock();
    }

    fn show_error(&mut self, error: Error) {
        match error {
            Error::Gateway(e) => {
                let text = match &e {
                    rchat_ai::GatewayError::Unavailable(reason) => {
                        format!("No reply: the assistant is unavailable ({}).", reason)
                    }
                    rchat_ai::GatewayError::InputInvalid(reason) => {
                        format!("The request was rejected: {}", reason)
                    }
                };
                self.show_note(ChatMessage::error(text));
            }
            Error::Stale => self.status = "Ready".to_string(),
            Error::SpeechDisabled => self.status = "Voice input is unavailable".to_string(),
            Error::Speech(SpeechError::NoSpeech) => self.status = "No speech detected".to_string(),
            Error::Speech(SpeechError::Unsupported) => {
                self.show_note(ChatMessage::error(
                    "Voice input is not supported on this system.",
                ));
                self.status = "Voice input is unavailable".to_string();
            }
            Error::Busy => self.status = "Waiting for the current reply...".to_string(),
            other => self.show_note(ChatMessage::error(other.to_string())),
        }
    }

    fn scroll_to_bottom(&mut self) {
        // Resolved during render based on content height
        self.follow = true;
    }

    /// Show a local note after the current messages
    pub fn show_note(&mut self, note: ChatMessage) {
        self.notes.push((self.messages.len(), note));
        self.scroll_to_bottom();
    }

    /// Show a system message
    pub fn show_system_message(&mut self, content: &str) {
        self.show_note(ChatMessage::system(content));
    }

    /// Advance reveal pacing
    pub fn tick(&mut self) {
        let now = Instant::now();
        for pacer in self.pacers.values_mut() {
            pacer.tick(now);
        }
        self.pacers.retain(|_, pacer| !pacer.is_complete());
    }

    fn skip_reveal(&mut self) {
        self.pacers.clear();
    }

    fn toggle_theme(&mut self) {
        self.theme = Theme::for_mode(!self.theme.dark);
        self.status = if self.theme.dark {
            "Dark mode".to_string()
        } else {
            "Light mode".to_string()
        };
    }

    fn react(&mut self, requested: Option<usize>, reaction: Reaction) {
        match reply_target(&self.messages, requested) {
            Ok(index) => {
                self.status = match self.feedback.toggle(index, reaction) {
                    Some(r) => format!("Reply {} {}", index + 1, r.label()),
                    None => format!("Reaction removed from reply {}", index + 1),
                };
            }
            Err(msg) => self.status = msg,
        }
    }

    fn copy_reply(&mut self, requested: Option<usize>) {
        let index = match reply_target(&self.messages, requested) {
            Ok(index) => index,
            Err(msg) => {
                self.status = msg;
                return;
            }
        };
        self.status = match crate::clipboard::copy_text(&self.messages[index].text) {
            Ok(()) => format!("Copied reply {}", index + 1),
            Err(e) => format!("Error: {}", e),
        };
    }

    /// User messages as (position, text), for the edit selector
    fn user_messages(&self) -> Vec<(usize, &str)> {
        self.messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_user)
            .map(|(i, m)| (i, m.text.as_str()))
            .collect()
    }

    fn start_editing(&mut self, index: usize) {
        if let Some(message) = self.messages.get(index) {
            self.input.set_content(message.text.clone());
            self.editing = Some(index);
            self.status = format!("Editing message {} (Enter to regenerate, Esc to cancel)", index + 1);
        }
    }

    /// Entries for the chat pane, with notes, reveal state and the pending placeholder
    fn display_messages(&self) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(self.messages.len() + self.notes.len() + 1);
        let mut notes = self.notes.iter().peekable();
        let waiting = self.is_thinking;

        for (i, message) in self.messages.iter().enumerate() {
            while let Some((_, note)) = notes.next_if(|(at, _)| *at <= i) {
                out.push(note.clone());
            }
            if waiting && self.pending_at == Some(i) {
                out.push(ChatMessage::pending());
            }
            let mut entry =
                ChatMessage::from_message(message, i).with_reaction(self.feedback.get(i));
            if let Some(pacer) = self.pacers.get(&i) {
                if pacer.text() == message.text {
                    entry.content = pacer.visible_text().to_string();
                    entry = entry.revealing(!pacer.is_complete());
                }
            }
            out.push(entry);
        }
        out.extend(notes.map(|(_, note)| note.clone()));
        if waiting && self.pending_at.is_none_or(|at| at >= self.messages.len()) {
            out.push(ChatMessage::pending());
        }
        out
    }

    /// Handle an action while a request or capture is running
    fn handle_busy_action(&mut self, action: Action, width: u16) {
        match action {
            Action::Submit => self.status = "Waiting for the current reply...".to_string(),
            Action::PageUp => self.scroll_up(10),
            Action::PageDown => self.scroll_down(10),
            Action::Tab => self.skip_reveal(),
            Action::ToggleTheme => self.toggle_theme(),
            Action::ToggleSidebar => self.show_sidebar = !self.show_sidebar,
            Action::CopyReply => self.copy_reply(None),
            _ => {
                self.input.handle_action(&action, width);
            }
        }
    }

    fn scroll_up(&mut self, lines: usize) {
        self.follow = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    fn scroll_down(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    /// Handle keyboard action
    pub async fn handle_action(&mut self, action: Action, width: u16) -> bool {
        // Handle history selector if visible
        if self.history_selector.visible {
            match action {
                Action::Up => self.history_selector.up(self.history.len()),
                Action::Down => self.history_selector.down(self.history.len()),
                Action::Submit => {
                    self.history_selector.hide();
                    if let Some(entry) = self.history.get(self.history_selector.selected) {
                        self.input.set_content(entry.clone());
                        self.editing = None;
                    }
                }
                Action::Char('d') | Action::Delete => {
                    let selected = self.history_selector.selected;
                    let _ = self.ui_tx.send(UiMessage::DeleteHistory(selected)).await;
                    if self.history.len() <= 1 {
                        self.history_selector.hide();
                    } else if selected + 1 >= self.history.len() {
                        self.history_selector.selected = selected.saturating_sub(1);
                    }
                }
                Action::Escape | Action::HistorySelect => self.history_selector.hide(),
                // Ignore other actions while selector is open
                _ => {}
            }
            return true;
        }

        // Handle edit selector if visible
        if self.edit_selector.visible {
            let user_messages = self.user_messages();
            match action {
                Action::Up => self.edit_selector.up(user_messages.len()),
                Action::Down => self.edit_selector.down(user_messages.len()),
                Action::Submit => {
                    let target = user_messages
                        .get(self.edit_selector.selected)
                        .map(|&(index, _)| index);
                    self.edit_selector.hide();
                    if let Some(index) = target {
                        self.start_editing(index);
                    }
                }
                Action::Escape | Action::EditSelect => self.edit_selector.hide(),
                _ => {}
            }
            return true;
        }

        match action {
            Action::Submit => {
                let content = self.input.content().to_string();
                if content.trim().is_empty() {
                    return true;
                }
                self.input.clear();

                let message = if content.trim_start().starts_with('/') {
                    UiMessage::Command(content)
                } else if let Some(index) = self.editing.take() {
                    UiMessage::Edit {
                        index,
                        text: content.trim().to_string(),
                    }
                } else {
                    UiMessage::Submit(content)
                };
                let _ = self.ui_tx.send(message).await;
                true
            }
            Action::Quit => {
                let _ = self.ui_tx.send(UiMessage::Quit).await;
                false
            }
            Action::Interrupt | Action::Escape => {
                if self.editing.take().is_some() {
                    self.input.clear();
                    self.status = "Edit cancelled".to_string();
                    true
                } else {
                    let _ = self.ui_tx.send(UiMessage::Quit).await;
                    false
                }
            }
            Action::PageUp => {
                self.scroll_up(10);
                true
            }
            Action::PageDown => {
                self.scroll_down(10);
                true
            }
            Action::Tab => {
                self.skip_reveal();
                true
            }
            Action::Clear => {
                let _ = self.ui_tx.send(UiMessage::Clear).await;
                true
            }
            Action::CopyReply => {
                self.copy_reply(None);
                true
            }
            Action::ToggleSidebar => {
                self.show_sidebar = !self.show_sidebar;
                true
            }
            Action::HistorySelect => {
                if self.history.is_empty() {
                    self.status = "History is empty".to_string();
                } else {
                    self.history_selector.show_at(self.history.len() - 1);
                }
                true
            }
            Action::EditSelect => {
                let count = self.user_messages().len();
                if count == 0 {
                    self.status = "Nothing to edit yet".to_string();
                } else {
                    self.edit_selector.show_at(count - 1);
                }
                true
            }
            Action::ToggleTheme => {
                self.toggle_theme();
                true
            }
            Action::Voice => {
                let _ = self.ui_tx.send(UiMessage::Voice).await;
                true
            }
            _ => {
                self.input.handle_action(&action, width);
                true
            }
        }
    }

    /// Width of the input box for the given terminal width
    fn main_width(&self, total: u16) -> u16 {
        if self.show_sidebar && total > SIDEBAR_WIDTH + 20 {
            total - SIDEBAR_WIDTH
        } else {
            total
        }
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        let (main_area, sidebar_area) = if self.main_width(size.width) < size.width {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(20), Constraint::Length(SIDEBAR_WIDTH)])
                .split(size);
            (columns[0], Some(columns[1]))
        } else {
            (size, None)
        };

        // Layout: messages (flex), status bar (1), input (3)
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // Messages
                Constraint::Length(1), // Status
                Constraint::Length(3), // Input
            ])
            .split(main_area);

        self.render_messages(frame, chunks[0]);
        self.render_status(frame, chunks[1]);
        self.input.render(chunks[2], frame.buffer_mut(), &self.theme);

        if let Some(area) = sidebar_area {
            frame.render_widget(HistoryPanel::new(&self.history, &self.theme), area);
        }

        if self.history_selector.visible {
            self.render_history_selector(frame, size);
        }
        if self.edit_selector.visible {
            self.render_edit_selector(frame, size);
        }
    }

    fn render_history_selector(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<SelectorItem> = self
            .history
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                SelectorItem::new(crate::utils::truncate_chars(&entry.replace('\n', " "), 60))
                    .with_description((i + 1).to_string())
            })
            .collect();

        Selector::new("History (Enter: reuse, d: delete)", &items, &self.theme)
            .with_selected(self.history_selector.selected)
            .render_centered(area, frame.buffer_mut());
    }

    fn render_edit_selector(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<SelectorItem> = self
            .user_messages()
            .into_iter()
            .map(|(i, text)| {
                SelectorItem::new(format!(
                    "{}: {}",
                    i + 1,
                    crate::utils::truncate_chars(&text.replace('\n', " "), 60)
                ))
            })
            .collect();

        Selector::new("Edit message", &items, &self.theme)
            .with_selected(self.edit_selector.selected)
            .render_centered(area, frame.buffer_mut());
    }

    fn render_messages(&mut self, frame: &mut Frame, area: Rect) {
        let title = format!(" rchat │ {} ", self.model);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title(title);

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let messages = self.display_messages();
        if inner.height == 0 || messages.is_empty() {
            frame.render_widget(self.welcome(), inner);
            return;
        }

        // Leave a column for the scrollbar
        let width = inner.width.saturating_sub(1) as usize;
        let content_height = calculate_message_height(&messages, &self.theme, width);
        let max_scroll = content_height.saturating_sub(inner.height as usize);

        if self.follow {
            self.scroll = max_scroll;
        } else {
            self.scroll = self.scroll.min(max_scroll);
            if self.scroll == max_scroll {
                self.follow = true;
            }
        }

        let list_area = Rect {
            width: inner.width.saturating_sub(1),
            ..inner
        };
        let message_list = MessageList::new(&messages, &self.theme)
            .scroll(self.scroll)
            .spinner_start(self.spinner_start);
        frame.render_widget(message_list, list_area);

        // Render scrollbar if content overflows
        if content_height > inner.height as usize {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");

            let mut scrollbar_state = ScrollbarState::new(max_scroll).position(self.scroll);

            frame.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
        }
    }

    fn welcome(&self) -> Paragraph<'static> {
        let key = |k: &str, what: &str| {
            Line::from(vec![
                Span::styled(format!("    {:<10}", k), self.theme.accent_style()),
                Span::styled(what.to_string(), self.theme.base_style()),
            ])
        };
        Paragraph::new(vec![
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    "  ◆ ",
                    self.theme.accent_style().add_modifier(Modifier::BOLD),
                ),
                Span::styled("rchat", self.theme.base_style().add_modifier(Modifier::BOLD)),
                Span::styled(" - ask anything", self.theme.dim_style()),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                format!("  Model: {}", self.model),
                self.theme.dim_style(),
            )),
            Line::from(""),
            Line::from(Span::styled("  Keybindings", self.theme.warning_style())),
            Line::from(""),
            key("Enter", "Send message"),
            key("Ctrl+E", "Edit an earlier message"),
            key("Ctrl+O", "Search history"),
            key("Ctrl+B", "Toggle history sidebar"),
            key("Ctrl+R", "Voice input"),
            key("Ctrl+Y", "Copy last reply"),
            key("Ctrl+T", "Toggle dark/light mode"),
            key("Ctrl+L", "Clear conversation"),
            key("Tab", "Show reply at once"),
            key("PgUp/Dn", "Scroll"),
            key("Ctrl+C", "Quit"),
            Line::from(""),
            Line::from(Span::styled(
                "  Type a message or /help to get started...",
                self.theme.dim_style(),
            )),
        ])
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if self.is_thinking || self.is_listening {
            let label = if self.is_listening {
                "Listening..."
            } else {
                "Thinking... (Esc to cancel)"
            };
            let spinner = Spinner::new(label, &self.theme).with_start_time(self.spinner_start);
            frame.render_widget(spinner, area);
            return;
        }

        let left_content = format!("{} │ {}", self.model, self.status);
        let right_content = "Ctrl+E: edit │ Ctrl+O: history │ Ctrl+T: theme │ Ctrl+C: quit";

        let left_width = left_content.chars().count();
        let right_width = right_content.chars().count();
        let available = area.width as usize;

        let left_style = if self.status.starts_with("Error") {
            self.theme.error_style()
        } else {
            self.theme.dim_style()
        };

        let line = if left_width + right_width + 2 <= available {
            let spacing = available - left_width - right_width;
            Line::from(vec![
                Span::styled(left_content, left_style),
                Span::raw(" ".repeat(spacing)),
                Span::styled(right_content, self.theme.dim_style()),
            ])
        } else {
            Line::from(Span::styled(left_content, left_style))
        };

        frame.render_widget(Paragraph::new(line), area);
    }
}

/// What the loop should do after a slash command
enum CommandFlow {
    Continue,
    Start(PendingOp),
    Quit,
}

fn apply_command(state: &mut TuiState, session: &ChatSession, input: &str) -> CommandFlow {
    let Some(command) = parse_command(input) else {
        return CommandFlow::Continue;
    };
    match command {
        Command::Help => state.show_system_message(&help_message()),
        Command::Clear => clear_conversation(state, session),
        Command::History => state.show_system_message(&HistoryCommand::list_text(&session.history())),
        Command::Delete(index) => delete_history(state, session, index),
        Command::Edit { index, text } => {
            return CommandFlow::Start(PendingOp::Edit { index, text });
        }
        Command::Like(n) => state.react(n, Reaction::Like),
        Command::Dislike(n) => state.react(n, Reaction::Dislike),
        Command::Copy(n) => state.copy_reply(n),
        Command::Theme => state.toggle_theme(),
        Command::Voice => return voice_flow(state, session),
        Command::Quit => return CommandFlow::Quit,
        Command::Invalid(usage) => state.show_note(ChatMessage::error(usage)),
        Command::Unknown(cmd) => state.show_system_message(&format!(
            "Unknown command: /{}\nType /help for available commands.",
            cmd
        )),
    }
    CommandFlow::Continue
}

fn clear_conversation(state: &mut TuiState, session: &ChatSession) {
    session.clear_conversation();
    state.editing = None;
    state.status = "Cleared".to_string();
}

fn delete_history(state: &mut TuiState, session: &ChatSession, index: usize) {
    match session.delete_history(index) {
        Ok(entry) => state.status = HistoryCommand::deleted_text(index, &entry),
        Err(e) => state.show_note(ChatMessage::error(e.to_string())),
    }
}

fn voice_flow(state: &mut TuiState, session: &ChatSession) -> CommandFlow {
    if session.speech().is_disabled() {
        state.status = "Voice input is unavailable".to_string();
        CommandFlow::Continue
    } else {
        CommandFlow::Start(PendingOp::Voice)
    }
}

fn start_op(session: &ChatSession, op: PendingOp) -> Pin<Box<dyn Future<Output = OpOutcome> + '_>> {
    match op {
        PendingOp::Submit(text) => Box::pin(async move {
            match session.submit(&text).await {
                Ok(_) => OpOutcome::Replied,
                Err(e) => OpOutcome::Failed(e),
            }
        }),
        PendingOp::Edit { index, text } => Box::pin(async move {
            match session.edit_and_regenerate(index, &text).await {
                Ok(_) => OpOutcome::Replied,
                Err(e) => OpOutcome::Failed(e),
            }
        }),
        PendingOp::Voice => Box::pin(async move {
            match session.capture_speech().await {
                Ok(text) => OpOutcome::Transcript(text),
                Err(e) => OpOutcome::Failed(e),
            }
        }),
    }
}

type Term = Terminal<CrosstermBackend<Stdout>>;

fn setup_terminal() -> io::Result<Term> {
    use crossterm::{
        event::{EnableBracketedPaste, EnableMouseCapture},
        execute,
        terminal::{EnterAlternateScreen, enable_raw_mode},
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableBracketedPaste)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal(terminal: &mut Term) -> io::Result<()> {
    use crossterm::{
        event::{DisableBracketedPaste, DisableMouseCapture},
        execute,
        terminal::{LeaveAlternateScreen, disable_raw_mode},
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()
}

/// Run the TUI application
pub async fn run_tui(session: &ChatSession, settings: UiSettings) -> anyhow::Result<()> {
    let mut terminal = setup_terminal()?;

    // Create channels
    let (ui_tx, mut ui_rx) = mpsc::channel::<UiMessage>(32);

    let mut state = TuiState::new(settings, ui_tx);
    let mut conversation_rx = session.conversation().subscribe();
    let mut event_stream = EventStream::new();

    // Drives the spinner and reveal pacing
    let mut tick_interval = tokio::time::interval(Duration::from_millis(20));

    // Started at the top of the next iteration so the future can borrow the session
    let mut pending: Option<PendingOp> = None;

    let result = loop {
        if let Some(op) = pending.take() {
            state.begin(&op);
            let mut op_future = start_op(session, op);

            // Poll it alongside other events until completion
            let outcome = loop {
                state.sync(session);
                terminal.draw(|frame| state.render(frame))?;
                let width = state.main_width(terminal.size()?.width);

                tokio::select! {
                    biased;

                    outcome = &mut op_future => break Some(outcome),

                    event = conversation_rx.recv() => {
                        if let Ok(event) = event {
                            state.handle_conversation_event(event);
                        }
                    }

                    event = event_stream.next() => {
                        match event {
                            Some(Ok(Event::Key(key))) => match key_to_action(key) {
                                // Dropping the future releases the pending flag
                                Action::Interrupt | Action::Escape => break None,
                                Action::Quit => {
                                    restore_terminal(&mut terminal)?;
                                    return Ok(());
                                }
                                action => state.handle_busy_action(action, width),
                            },
                            Some(Ok(Event::Paste(text))) => {
                                state.input.handle_action(&Action::Paste(text), width);
                            }
                            Some(Ok(Event::Mouse(mouse))) => match mouse.kind {
                                MouseEventKind::ScrollUp => state.scroll_up(3),
                                MouseEventKind::ScrollDown => state.scroll_down(3),
                                _ => {}
                            },
                            Some(Err(_)) | None => {
                                restore_terminal(&mut terminal)?;
                                return Ok(());
                            }
                            _ => {}
                        }
                    }

                    _ = tick_interval.tick() => state.tick(),
                }
            };
            drop(op_future);

            // Drain any remaining events after the operation completes
            while let Ok(event) = conversation_rx.try_recv() {
                state.handle_conversation_event(event);
            }
            state.sync(session);
            state.finish(outcome);
            continue;
        }

        state.sync(session);
        terminal.draw(|frame| state.render(frame))?;
        let width = state.main_width(terminal.size()?.width);

        tokio::select! {
            biased;

            event = conversation_rx.recv() => {
                if let Ok(event) = event {
                    state.handle_conversation_event(event);
                }
            }

            event = event_stream.next() => {
                match event {
                    Some(Ok(Event::Key(key))) => {
                        if !state.handle_action(key_to_action(key), width).await {
                            break Ok(());
                        }
                    }
                    Some(Ok(Event::Paste(text))) => {
                        state.handle_action(Action::Paste(text), width).await;
                    }
                    Some(Ok(Event::Mouse(mouse))) => match mouse.kind {
                        MouseEventKind::ScrollUp => state.scroll_up(3),
                        MouseEventKind::ScrollDown => state.scroll_down(3),
                        _ => {}
                    },
                    Some(Err(e)) => break Err(anyhow::anyhow!("Event error: {}", e)),
                    None => break Ok(()),
                    _ => {}
                }
            }

            _ = tick_interval.tick() => state.tick(),

            msg = ui_rx.recv() => {
                match msg {
                    Some(UiMessage::Submit(content)) => pending = Some(PendingOp::Submit(content)),
                    Some(UiMessage::Edit { index, text }) => {
                        pending = Some(PendingOp::Edit { index, text });
                    }
                    Some(UiMessage::Command(input)) => match apply_command(&mut state, session, &input) {
                        CommandFlow::Continue => {}
                        CommandFlow::Start(op) => pending = Some(op),
                        CommandFlow::Quit => break Ok(()),
                    },
                    Some(UiMessage::Voice) => {
                        if let CommandFlow::Start(op) = voice_flow(&mut state, session) {
                            pending = Some(op);
                        }
                    }
                    Some(UiMessage::Clear) => clear_conversation(&mut state, session),
                    Some(UiMessage::DeleteHistory(index)) => delete_history(&mut state, session, index),
                    Some(UiMessage::Quit) | None => break Ok(()),
                }
            }
        }
    };

    restore_terminal(&mut terminal)?;
    result
}
