//! Classify message text for display

use crate::highlight;
use crate::markdown::{self, Block};
use rchat_core::Message;

const FENCE: &str = "```";

/// Language tag used when a fenced reply does not name one
pub const DEFAULT_LANGUAGE: &str = "text";

/// How a message body should be displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    /// The whole text is one fenced code block
    Code {
        language: String,
        body: String,
        /// Highlighting theme for the display mode
        syntax_theme: &'static str,
    },
    /// Anything else, parsed as markdown
    Markdown(Vec<Block>),
}

/// Decide how to display `message`. Pure: the same input always gives the
/// same output.
pub fn present(message: &Message, dark_mode: bool) -> Presentation {
    match detect_code_block(&message.text) {
        Some((language, body)) => Presentation::Code {
            language,
            body,
            syntax_theme: highlight::theme_name(dark_mode),
        },
        None => Presentation::Markdown(markdown::parse(&message.text)),
    }
}

/// Split text that starts and ends with a triple-backtick fence into its
/// language tag and body.
pub fn detect_code_block(text: &str) -> Option<(String, String)> {
    let inner = text
        .strip_prefix(FENCE)?
        .strip_suffix(FENCE)
        .filter(|_| text.len() >= FENCE.len() * 2)?;

    let (tag, body) = match inner.split_once('\n') {
        Some((tag, body)) => (tag.trim(), body),
        None => ("", inner),
    };
    let language = if tag.is_empty() {
        DEFAULT_LANGUAGE.to_string()
    } else {
        tag.to_string()
    };
    let body = body.trim_matches(|c| c == '\n' || c == '\r').to_string();
    Some((language, body))
}
