//! rchat-ai: boundary to the external text-generation service
//!
//! This crate defines the [`ResponseGateway`] contract the chat core talks to,
//! and a Gemini implementation that streams replies from the Google
//! Generative Language API.

pub mod error;
pub mod providers;
pub mod stream;
pub mod types;

pub use error::{Error, GatewayError, Result};
pub use providers::{ResponseGateway, google::GeminiGateway};
pub use stream::{ReplyEvent, ReplyStream};
pub use types::*;
