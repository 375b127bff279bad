//! /history and /delete output

use crate::utils::truncate_chars;

pub struct HistoryCommand;

impl HistoryCommand {
    /// Numbered listing of history entries, oldest first
    pub fn list_text(entries: &[String]) -> String {
        if entries.is_empty() {
            return "History is empty.".to_string();
        }
        let mut output = format!("History ({} entries):\n", entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let preview = truncate_chars(&entry.replace('\n', " "), 70);
            output.push_str(&format!("  {:>3}. {}\n", i + 1, preview));
        }
        output.push_str("\nUse /delete <n> to remove an entry.");
        output
    }

    /// Message shown after an entry was removed
    pub fn deleted_text(index: usize, entry: &str) -> String {
        format!(
            "Deleted history entry {}: {}",
            index + 1,
            truncate_chars(&entry.replace('\n', " "), 50)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_numbers_from_one() {
        let text = HistoryCommand::list_text(&["first".into(), "second\nline".into()]);
        assert!(text.contains("  1. first"));
        assert!(text.contains("  2. second line"));
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(HistoryCommand::list_text(&[]), "History is empty.");
    }
}
