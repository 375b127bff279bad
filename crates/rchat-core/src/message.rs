//! Conversation messages

use serde::{Deserialize, Serialize};

/// One turn's text, authored by either the user or the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message body
    pub text: String,
    /// `true` when the user wrote it, `false` for assistant replies
    pub is_user: bool,
}

impl Message {
    /// A message authored by the user
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: true,
        }
    }

    /// A reply from the assistant
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: false,
        }
    }

    /// Role label for display and logs
    pub fn role(&self) -> &'static str {
        if self.is_user { "user" } else { "assistant" }
    }
}
