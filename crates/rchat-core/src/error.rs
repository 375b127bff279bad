//! Error types for rchat-core

use crate::speech::SpeechError;
use rchat_ai::GatewayError;
use thiserror::Error;

/// Result type alias using rchat-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during conversation and history operations
#[derive(Error, Debug)]
pub enum Error {
    /// The gateway produced no reply
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A position outside the sequence was addressed
    #[error("index {index} is out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Edit targeted an assistant message
    #[error("message {index} was not written by the user")]
    NotUserMessage { index: usize },

    /// A request is already in flight
    #[error("a request is already in progress")]
    Busy,

    /// The conversation was cleared while the request was in flight
    #[error("conversation was reset before the reply arrived")]
    Stale,

    /// Persisted payload could not be decoded
    #[error("stored history is corrupt: {0}")]
    StorageCorrupt(String),

    /// Durable storage failed
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Speech capture failed
    #[error(transparent)]
    Speech(#[from] SpeechError),

    /// Speech input was turned off after an unsupported-capture report
    #[error("speech input is disabled")]
    SpeechDisabled,
}

impl Error {
    /// Check if this error came from the gateway
    pub fn is_gateway(&self) -> bool {
        matches!(self, Error::Gateway(_))
    }
}
