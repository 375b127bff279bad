//! Conversation event types

use crate::message::Message;
use serde::{Deserialize, Serialize};

/// Events broadcast as the conversation changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// The pending flag flipped
    ThinkingChanged { thinking: bool },

    /// A message was pushed to the end
    MessageAppended { index: usize, message: Message },

    /// A user message's text was rewritten in place
    MessageEdited { index: usize, message: Message },

    /// The message at `index` was replaced
    MessageReplaced { index: usize, message: Message },

    /// A message was inserted at `index`; every later message moved down one position
    MessageInserted { index: usize, message: Message },

    /// The conversation was emptied
    Cleared,

    /// The gateway call produced no reply
    RequestFailed { message: String },
}

impl ConversationEvent {
    /// Check if this event changes the message sequence
    pub fn mutates_messages(&self) -> bool {
        matches!(
            self,
            ConversationEvent::MessageAppended { .. }
                | ConversationEvent::MessageEdited { .. }
                | ConversationEvent::MessageReplaced { .. }
                | ConversationEvent::MessageInserted { .. }
                | ConversationEvent::Cleared
        )
    }
}
