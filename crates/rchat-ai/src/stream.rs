//! Streaming reply events and accumulation

use crate::error::{Error, Result};
use crate::types::{FinishReason, Usage};
use futures::StreamExt;
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted while a reply streams in
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyEvent {
    /// A piece of reply text
    TextDelta { delta: String },
    /// The service finished the reply
    Done {
        finish_reason: Option<FinishReason>,
        usage: Usage,
    },
    /// The stream failed; `status` carries the service status code when known
    Error {
        status: Option<String>,
        message: String,
    },
}

impl ReplyEvent {
    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReplyEvent::Done { .. } | ReplyEvent::Error { .. })
    }
}

/// A stream of reply events
pub type ReplyStream = Pin<Box<dyn Stream<Item = ReplyEvent> + Send>>;

/// Accumulates streamed deltas into the final reply text
#[derive(Debug, Default)]
pub struct ReplyBuilder {
    text: String,
    finish_reason: Option<FinishReason>,
    usage: Usage,
    error: Option<Error>,
    done: bool,
}

impl ReplyBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one event
    pub fn process_event(&mut self, event: &ReplyEvent) {
        match event {
            ReplyEvent::TextDelta { delta } => self.text.push_str(delta),
            ReplyEvent::Done {
                finish_reason,
                usage,
            } => {
                self.finish_reason = *finish_reason;
                self.usage = *usage;
                self.done = true;
            }
            ReplyEvent::Error { status, message } => {
                self.error = Some(match status {
                    Some(status) => Error::api(status.clone(), message.clone()),
                    None => Error::Sse(message.clone()),
                });
            }
        }
    }

    /// Text accumulated so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Finish reason, once known
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Usage, once known
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// Produce the reply, or the reason there is none
    pub fn build(self) -> Result<String> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if !self.done {
            return Err(Error::Sse("stream ended before the reply completed".into()));
        }
        if self.text.trim().is_empty() {
            return Err(Error::EmptyResponse);
        }
        Ok(self.text)
    }
}

/// Drain a reply stream into the final text
pub async fn collect_reply(mut stream: ReplyStream) -> Result<String> {
    let mut builder = ReplyBuilder::new();
    while let Some(event) = stream.next().await {
        let terminal = event.is_terminal();
        builder.process_event(&event);
        if terminal {
            break;
        }
    }
    if let Some(reason) = builder.finish_reason() {
        tracing::debug!(
            ?reason,
            prompt_tokens = builder.usage().prompt,
            reply_tokens = builder.usage().reply,
            "reply finished"
        );
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_of(events: Vec<ReplyEvent>) -> ReplyStream {
        Box::pin(futures::stream::iter(events))
    }

    #[tokio::test]
    async fn test_collect_joins_deltas() {
        let stream = stream_of(vec![
            ReplyEvent::TextDelta { delta: "hi ".into() },
            ReplyEvent::TextDelta { delta: "there".into() },
            ReplyEvent::Done {
                finish_reason: Some(FinishReason::Stop),
                usage: Usage { prompt: 2, reply: 2 },
            },
        ]);
        assert_eq!(collect_reply(stream).await.unwrap(), "hi there");
    }

    #[tokio::test]
    async fn test_collect_empty_reply_is_error() {
        let stream = stream_of(vec![
            ReplyEvent::TextDelta { delta: "  \n".into() },
            ReplyEvent::Done {
                finish_reason: Some(FinishReason::Safety),
                usage: Usage::default(),
            },
        ]);
        assert!(matches!(collect_reply(stream).await, Err(Error::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_collect_error_event_wins_over_partial_text() {
        let stream = stream_of(vec![
            ReplyEvent::TextDelta { delta: "partial".into() },
            ReplyEvent::Error {
                status: Some("UNAVAILABLE".into()),
                message: "overloaded".into(),
            },
        ]);
        match collect_reply(stream).await {
            Err(Error::Api { status, message }) => {
                assert_eq!(status, "UNAVAILABLE");
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_collect_truncated_stream_is_error() {
        let stream = stream_of(vec![ReplyEvent::TextDelta { delta: "cut".into() }]);
        assert!(matches!(collect_reply(stream).await, Err(Error::Sse(_))));
    }
}
