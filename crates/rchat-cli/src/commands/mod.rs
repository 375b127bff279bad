//! Slash commands for interactive mode

mod history;

pub use history::HistoryCommand;

use rchat_core::Message;

/// A parsed slash command. Message and history numbers are 1-based on the
/// command line and stored 0-based here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    /// Empty the conversation
    Clear,
    /// List history entries
    History,
    /// Remove a history entry
    Delete(usize),
    /// Rewrite a user message and regenerate its reply
    Edit { index: usize, text: String },
    /// Like a reply (the latest when no number is given)
    Like(Option<usize>),
    /// Dislike a reply (the latest when no number is given)
    Dislike(Option<usize>),
    /// Copy a reply to the clipboard (the latest when no number is given)
    Copy(Option<usize>),
    /// Switch between dark and light mode
    Theme,
    /// Capture a spoken query
    Voice,
    /// Exit the application
    Quit,
    /// Arguments did not fit the command; carries the usage line
    Invalid(String),
    /// Unknown command
    Unknown(String),
}

/// Parse a slash command; returns `None` when `input` is not one
pub fn parse_command(input: &str) -> Option<Command> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or("").to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => Command::Help,
        "clear" | "c" => Command::Clear,
        "history" => Command::History,
        "delete" | "d" => match parse_number(args) {
            Some(n) => Command::Delete(n),
            None => Command::Invalid("Usage: /delete <n>".into()),
        },
        "edit" | "e" => {
            let (number, text) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
            match (parse_number(number), text.trim()) {
                (Some(index), text) if !text.is_empty() => Command::Edit {
                    index,
                    text: text.to_string(),
                },
                _ => Command::Invalid("Usage: /edit <n> <new text>".into()),
            }
        }
        "like" => match parse_optional_number(args) {
            Ok(n) => Command::Like(n),
            Err(()) => Command::Invalid("Usage: /like [n]".into()),
        },
        "dislike" => match parse_optional_number(args) {
            Ok(n) => Command::Dislike(n),
            Err(()) => Command::Invalid("Usage: /dislike [n]".into()),
        },
        "copy" => match parse_optional_number(args) {
            Ok(n) => Command::Copy(n),
            Err(()) => Command::Invalid("Usage: /copy [n]".into()),
        },
        "theme" => Command::Theme,
        "voice" | "v" => Command::Voice,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(command),
    })
}

/// 1-based number to 0-based index
fn parse_number(s: &str) -> Option<usize> {
    s.trim().parse::<usize>().ok()?.checked_sub(1)
}

fn parse_optional_number(s: &str) -> Result<Option<usize>, ()> {
    if s.trim().is_empty() {
        return Ok(None);
    }
    parse_number(s).map(Some).ok_or(())
}

/// Resolve the assistant message a reaction or copy applies to
pub fn reply_target(messages: &[Message], requested: Option<usize>) -> Result<usize, String> {
    match requested {
        None => messages
            .iter()
            .rposition(|m| !m.is_user)
            .ok_or_else(|| "No reply yet.".to_string()),
        Some(index) => match messages.get(index) {
            None => Err(format!("There is no message {}.", index + 1)),
            Some(m) if m.is_user => Err(format!("Message {} is not a reply.", index + 1)),
            Some(_) => Ok(index),
        },
    }
}

pub fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?         Show this help message
  /clear, /c            Clear the conversation
  /history              List search history
  /delete, /d <n>       Delete history entry n
  /edit, /e <n> <text>  Rewrite message n and regenerate its reply
  /like [n]             Like reply n (default: latest)
  /dislike [n]          Dislike reply n (default: latest)
  /copy [n]             Copy reply n to the clipboard (default: latest)
  /theme                Toggle dark/light mode
  /voice, /v            Speak a query
  /quit, /exit, /q      Exit rchat

Messages and history entries are numbered from 1."#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_command() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("  what is /x"), None);
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_command("/help"), Some(Command::Help));
        assert_eq!(parse_command(" /CLEAR "), Some(Command::Clear));
        assert_eq!(parse_command("/theme"), Some(Command::Theme));
        assert_eq!(parse_command("/exit"), Some(Command::Quit));
        assert_eq!(parse_command("/frobnicate"), Some(Command::Unknown("frobnicate".into())));
    }

    #[test]
    fn test_numbers_are_one_based() {
        assert_eq!(parse_command("/delete 1"), Some(Command::Delete(0)));
        assert_eq!(parse_command("/like 4"), Some(Command::Like(Some(3))));
        assert_eq!(parse_command("/copy"), Some(Command::Copy(None)));
        assert!(matches!(parse_command("/delete 0"), Some(Command::Invalid(_))));
        assert!(matches!(parse_command("/delete"), Some(Command::Invalid(_))));
        assert!(matches!(parse_command("/dislike two"), Some(Command::Invalid(_))));
    }

    #[test]
    fn test_edit_takes_number_and_text() {
        assert_eq!(
            parse_command("/edit 3 what about  rust?"),
            Some(Command::Edit {
                index: 2,
                text: "what about  rust?".into()
            })
        );
        assert!(matches!(parse_command("/edit 3"), Some(Command::Invalid(_))));
        assert!(matches!(parse_command("/edit x hi"), Some(Command::Invalid(_))));
    }

    #[test]
    fn test_reply_target() {
        let messages = vec![
            Message::user("q1"),
            Message::assistant("a1"),
            Message::user("q2"),
            Message::assistant("a2"),
            Message::user("q3"),
        ];
        assert_eq!(reply_target(&messages, None), Ok(3));
        assert_eq!(reply_target(&messages, Some(1)), Ok(1));
        assert!(reply_target(&messages, Some(0)).is_err());
        assert!(reply_target(&messages, Some(9)).is_err());
        assert!(reply_target(&[Message::user("q")], None).is_err());
    }
}
