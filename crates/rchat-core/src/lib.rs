//! rchat-core: conversation state, search history and speech input
//!
//! This crate owns the chat thread and its single in-flight request, the
//! persisted list of past queries, and the speech input session. It talks to
//! the generation service only through [`rchat_ai::ResponseGateway`].

pub mod conversation;
pub mod error;
pub mod events;
pub mod handle;
pub mod history;
pub mod message;
pub mod session;
pub mod speech;
pub mod storage;

pub use conversation::{ConversationConfig, ConversationState, DEFAULT_REQUEST_TIMEOUT};
pub use error::{Error, Result};
pub use events::ConversationEvent;
pub use handle::ConversationHandle;
pub use history::HistoryStore;
pub use message::Message;
pub use session::ChatSession;
pub use speech::{SpeechError, SpeechInput, SpeechRecognizer, UnsupportedRecognizer};
pub use storage::{FileSlot, HistorySlot, MemorySlot};
