//! Conversation state: the ordered message sequence and its single in-flight request.

use crate::{
    error::{Error, Result},
    events::ConversationEvent,
    handle::{ConversationHandle, PendingGuard},
    message::Message,
};
use parking_lot::Mutex;
use rchat_ai::{GatewayError, ResponseGateway};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;
use tokio::sync::broadcast;

/// Default deadline for one gateway call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for a conversation
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// How long a gateway call may take before it counts as unavailable
    pub request_timeout: Duration,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// The ordered messages of one chat thread.
///
/// Outside an in-flight request every user message is followed by exactly one
/// assistant reply. At most one gateway call is outstanding; a second
/// `submit` or `edit_and_regenerate` while one is pending fails with
/// [`Error::Busy`].
pub struct ConversationState {
    messages: Mutex<Vec<Message>>,
    epoch: AtomicU64,
    gateway: Arc<dyn ResponseGateway>,
    config: ConversationConfig,
    handle: ConversationHandle,
}

impl ConversationState {
    /// Create an empty conversation backed by `gateway`
    pub fn new(gateway: Arc<dyn ResponseGateway>) -> Self {
        Self::with_config(gateway, ConversationConfig::default())
    }

    /// Create an empty conversation with explicit configuration
    pub fn with_config(gateway: Arc<dyn ResponseGateway>, config: ConversationConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            messages: Mutex::new(Vec::new()),
            epoch: AtomicU64::new(0),
            gateway,
            config,
            handle: ConversationHandle::new(event_tx),
        }
    }

    /// Subscribe to conversation events
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.handle.subscribe()
    }

    /// Get a cloneable handle for observing pending state
    pub fn handle(&self) -> ConversationHandle {
        self.handle.clone()
    }

    /// Get the configuration
    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    /// Whether a gateway call is outstanding
    pub fn is_thinking(&self) -> bool {
        self.handle.is_thinking()
    }

    /// Snapshot of all messages
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    /// Message at `index`, if any
    pub fn message(&self, index: usize) -> Option<Message> {
        self.messages.lock().get(index).cloned()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Whether the conversation has no messages
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// The most recent assistant reply
    pub fn last_reply(&self) -> Option<Message> {
        self.messages
            .lock()
            .iter()
            .rev()
            .find(|m| !m.is_user)
            .cloned()
    }

    /// Push a message to the end.
    pub fn append(&self, message: Message) {
        let mut messages = self.messages.lock();
        messages.push(message.clone());
        self.emit(ConversationEvent::MessageAppended {
            index: messages.len() - 1,
            message,
        });
    }

    /// Drop every message. A reply still in flight is discarded when it lands.
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.messages.lock().clear();
        self.emit(ConversationEvent::Cleared);
    }

    /// Append `text` as a user message and fetch the assistant reply.
    ///
    /// On success the reply is placed right after the user message and
    /// returned. On failure the user message stays and no reply is added.
    pub async fn submit(&self, text: &str) -> Result<Message> {
        let guard = self.claim()?;
        self.submit_claimed(guard, text).await
    }

    /// Take the in-flight slot ahead of a submit
    pub(crate) fn claim(&self) -> Result<PendingGuard> {
        self.handle.try_begin().ok_or(Error::Busy)
    }

    /// Run a submit on a slot taken with [`Self::claim`]; the slot is released when this returns.
    pub(crate) async fn submit_claimed(&self, _guard: PendingGuard, text: &str) -> Result<Message> {
        let (epoch, user_index) = {
            let mut messages = self.messages.lock();
            let message = Message::user(text);
            messages.push(message.clone());
            let index = messages.len() - 1;
            self.emit(ConversationEvent::MessageAppended { index, message });
            (self.epoch.load(Ordering::Acquire), index)
        };

        let reply = self.request(text).await;

        let mut messages = self.messages.lock();
        self.check_epoch(epoch)?;
        let reply = self.settle(reply)?;

        let message = Message::assistant(reply);
        let index = (user_index + 1).min(messages.len());
        messages.insert(index, message.clone());
        if index + 1 == messages.len() {
            self.emit(ConversationEvent::MessageAppended {
                index,
                message: message.clone(),
            });
        } else {
            self.emit(ConversationEvent::MessageInserted {
                index,
                message: message.clone(),
            });
        }
        Ok(message)
    }

    /// Rewrite the user message at `index` and regenerate the reply that follows it.
    ///
    /// The edited text is kept even when the gateway fails. On success the
    /// assistant message at `index + 1` is replaced, or the reply is inserted
    /// there when that position is missing or holds a user message. Messages
    /// after `index + 1` are left untouched. Returns the updated snapshot.
    pub async fn edit_and_regenerate(&self, index: usize, new_text: &str) -> Result<Vec<Message>> {
        validate_edit_target(&self.messages.lock(), index)?;
        let _guard = self.handle.try_begin().ok_or(Error::Busy)?;

        let epoch = {
            let mut messages = self.messages.lock();
            validate_edit_target(&messages, index)?;
            messages[index].text = new_text.to_string();
            self.emit(ConversationEvent::MessageEdited {
                index,
                message: messages[index].clone(),
            });
            self.epoch.load(Ordering::Acquire)
        };

        let reply = self.request(new_text).await;

        let mut messages = self.messages.lock();
        self.check_epoch(epoch)?;
        let reply = self.settle(reply)?;

        let message = Message::assistant(reply);
        let reply_index = index + 1;
        match messages.get(reply_index) {
            Some(existing) if !existing.is_user => {
                messages[reply_index] = message.clone();
                self.emit(ConversationEvent::MessageReplaced {
                    index: reply_index,
                    message,
                });
            }
            Some(_) => {
                messages.insert(reply_index, message.clone());
                self.emit(ConversationEvent::MessageInserted {
                    index: reply_index,
                    message,
                });
            }
            None => {
                messages.push(message.clone());
                self.emit(ConversationEvent::MessageAppended {
                    index: messages.len() - 1,
                    message,
                });
            }
        }
        Ok(messages.clone())
    }

    async fn request(&self, prompt: &str) -> std::result::Result<String, GatewayError> {
        let timeout = self.config.request_timeout;
        match tokio::time::timeout(timeout, self.gateway.send(prompt)).await {
            Ok(Ok(text)) if text.trim().is_empty() => {
                Err(GatewayError::unavailable("empty reply"))
            }
            Ok(result) => result,
            Err(_) => Err(GatewayError::timed_out(timeout)),
        }
    }

    fn check_epoch(&self, issued: u64) -> Result<()> {
        if self.epoch.load(Ordering::Acquire) != issued {
            tracing::warn!("discarding reply for a conversation that was cleared");
            return Err(Error::Stale);
        }
        Ok(())
    }

    fn settle(&self, reply: std::result::Result<String, GatewayError>) -> Result<String> {
        reply.map_err(|e| {
            tracing::warn!(error = %e, "no reply from gateway");
            self.emit(ConversationEvent::RequestFailed {
                message: e.to_string(),
            });
            Error::Gateway(e)
        })
    }

    fn emit(&self, event: ConversationEvent) {
        let _ = self.handle.event_tx.send(event);
    }
}

fn validate_edit_target(messages: &[Message], index: usize) -> Result<()> {
    match messages.get(index) {
        None => Err(Error::IndexOutOfRange {
            index,
            len: messages.len(),
        }),
        Some(m) if !m.is_user => Err(Error::NotUserMessage { index }),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    /// A mock gateway that returns scripted replies in order.
    pub(crate) struct MockGateway {
        replies: parking_lot::Mutex<VecDeque<std::result::Result<String, GatewayError>>>,
        prompts: parking_lot::Mutex<Vec<String>>,
        gate: Option<Arc<Notify>>,
    }

    impl MockGateway {
        pub(crate) fn new(replies: Vec<std::result::Result<String, GatewayError>>) -> Self {
            Self {
                replies: parking_lot::Mutex::new(replies.into()),
                prompts: parking_lot::Mutex::new(Vec::new()),
                gate: None,
            }
        }

        pub(crate) fn replying(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
        }

        /// Block every `send` until the gate is notified.
        pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        pub(crate) fn prompts(&self) -> Vec<String> {
            self.prompts.lock().clone()
        }
    }

    #[async_trait]
    impl ResponseGateway for MockGateway {
        async fn send(&self, prompt: &str) -> std::result::Result<String, GatewayError> {
            self.prompts.lock().push(prompt.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(GatewayError::unavailable("no scripted reply")))
        }
    }

    fn texts(messages: &[Message]) -> Vec<(&str, bool)> {
        messages.iter().map(|m| (m.text.as_str(), m.is_user)).collect()
    }

    fn seeded(gateway: MockGateway) -> ConversationState {
        let state = ConversationState::new(Arc::new(gateway));
        state.append(Message::user("A"));
        state.append(Message::assistant("a1"));
        state.append(Message::user("B"));
        state.append(Message::assistant("b1"));
        state
    }

    #[test]
    fn test_append_and_clear() {
        let state = ConversationState::new(Arc::new(MockGateway::replying(&[])));
        assert!(state.is_empty());
        state.append(Message::user("hi"));
        state.append(Message::assistant("hello"));
        assert_eq!(state.len(), 2);
        assert_eq!(state.last_reply().unwrap().text, "hello");

        state.clear();
        assert!(state.is_empty());
        assert!(state.last_reply().is_none());
    }

    #[tokio::test]
    async fn test_submit_appends_user_then_reply() {
        let gateway = Arc::new(MockGateway::replying(&["Rust is a systems language."]));
        let state = ConversationState::new(gateway.clone());

        let reply = state.submit("What is Rust?").await.unwrap();
        assert_eq!(reply, Message::assistant("Rust is a systems language."));
        assert_eq!(
            texts(&state.messages()),
            vec![
                ("What is Rust?", true),
                ("Rust is a systems language.", false)
            ]
        );
        assert_eq!(gateway.prompts(), vec!["What is Rust?".to_string()]);
        assert!(!state.is_thinking());
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_user_message_only() {
        let gateway = MockGateway::new(vec![Err(GatewayError::unavailable("offline"))]);
        let state = ConversationState::new(Arc::new(gateway));
        let mut rx = state.subscribe();

        let err = state.submit("hello").await.unwrap_err();
        assert!(matches!(err, Error::Gateway(GatewayError::Unavailable(_))));
        assert_eq!(texts(&state.messages()), vec![("hello", true)]);
        assert!(!state.is_thinking());

        let mut saw_failure = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ConversationEvent::RequestFailed { .. }) {
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test]
    async fn test_blank_reply_is_unavailable() {
        let state = ConversationState::new(Arc::new(MockGateway::replying(&["   "])));
        let err = state.submit("hello").await.unwrap_err();
        assert!(matches!(err, Error::Gateway(GatewayError::Unavailable(_))));
        assert_eq!(state.len(), 1);
    }

    #[tokio::test]
    async fn test_thinking_events_bracket_request() {
        let state = ConversationState::new(Arc::new(MockGateway::replying(&["ok"])));
        let mut rx = state.subscribe();
        state.submit("hi").await.unwrap();

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            events.first(),
            Some(&ConversationEvent::ThinkingChanged { thinking: true })
        );
        assert!(events.contains(&ConversationEvent::ThinkingChanged { thinking: false }));
    }

    #[tokio::test]
    async fn test_second_request_while_busy_is_rejected() {
        let gate = Arc::new(Notify::new());
        let gateway = MockGateway::replying(&["first"]).gated(gate.clone());
        let state = Arc::new(ConversationState::new(Arc::new(gateway)));

        let pending = {
            let state = state.clone();
            tokio::spawn(async move { state.submit("one").await })
        };
        while !state.is_thinking() {
            tokio::task::yield_now().await;
        }

        assert!(matches!(state.submit("two").await, Err(Error::Busy)));
        assert!(matches!(
            state.edit_and_regenerate(0, "changed").await,
            Err(Error::Busy)
        ));

        gate.notify_one();
        let reply = pending.await.unwrap().unwrap();
        assert_eq!(reply.text, "first");
        assert_eq!(texts(&state.messages()), vec![("one", true), ("first", false)]);
    }

    #[tokio::test]
    async fn test_edit_replaces_following_reply_only() {
        let state = seeded(MockGateway::replying(&["a2"]));

        let snapshot = state.edit_and_regenerate(0, "A2").await.unwrap();
        assert_eq!(
            texts(&snapshot),
            vec![("A2", true), ("a2", false), ("B", true), ("b1", false)]
        );
        assert_eq!(snapshot, state.messages());
    }

    #[tokio::test]
    async fn test_edit_failure_keeps_edited_text_and_old_reply() {
        let state = seeded(MockGateway::new(vec![Err(GatewayError::unavailable("down"))]));

        let err = state.edit_and_regenerate(0, "A2").await.unwrap_err();
        assert!(err.is_gateway());
        assert_eq!(
            texts(&state.messages()),
            vec![("A2", true), ("a1", false), ("B", true), ("b1", false)]
        );
    }

    #[tokio::test]
    async fn test_edit_rejects_bad_targets() {
        let state = seeded(MockGateway::replying(&[]));

        assert!(matches!(
            state.edit_and_regenerate(9, "x").await,
            Err(Error::IndexOutOfRange { index: 9, len: 4 })
        ));
        assert!(matches!(
            state.edit_and_regenerate(1, "x").await,
            Err(Error::NotUserMessage { index: 1 })
        ));
        assert_eq!(state.message(1).unwrap().text, "a1");
    }

    #[tokio::test]
    async fn test_edit_inserts_when_next_is_user() {
        let state = ConversationState::new(Arc::new(MockGateway::replying(&["fresh"])));
        state.append(Message::user("failed turn"));
        state.append(Message::user("B"));
        state.append(Message::assistant("b1"));
        let mut rx = state.subscribe();

        let snapshot = state.edit_and_regenerate(0, "retry").await.unwrap();
        assert_eq!(
            texts(&snapshot),
            vec![("retry", true), ("fresh", false), ("B", true), ("b1", false)]
        );

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            events,
            vec![
                ConversationEvent::ThinkingChanged { thinking: true },
                ConversationEvent::MessageEdited {
                    index: 0,
                    message: Message::user("retry"),
                },
                ConversationEvent::MessageInserted {
                    index: 1,
                    message: Message::assistant("fresh"),
                },
                ConversationEvent::ThinkingChanged { thinking: false },
            ]
        );
    }

    #[tokio::test]
    async fn test_edit_replacing_reply_emits_replaced() {
        let state = seeded(MockGateway::replying(&["a2"]));
        let mut rx = state.subscribe();

        state.edit_and_regenerate(0, "A2").await.unwrap();

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(events.contains(&ConversationEvent::MessageReplaced {
            index: 1,
            message: Message::assistant("a2"),
        }));
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, ConversationEvent::MessageInserted { .. }))
        );
    }

    #[tokio::test]
    async fn test_edit_last_user_message_appends_reply() {
        let state = ConversationState::new(Arc::new(MockGateway::replying(&["late"])));
        state.append(Message::user("only"));

        let snapshot = state.edit_and_regenerate(0, "only, edited").await.unwrap();
        assert_eq!(texts(&snapshot), vec![("only, edited", true), ("late", false)]);
    }

    #[tokio::test]
    async fn test_clear_discards_late_reply() {
        let gate = Arc::new(Notify::new());
        let gateway = MockGateway::replying(&["too late"]).gated(gate.clone());
        let state = Arc::new(ConversationState::new(Arc::new(gateway)));

        let pending = {
            let state = state.clone();
            tokio::spawn(async move { state.submit("question").await })
        };
        while !state.is_thinking() {
            tokio::task::yield_now().await;
        }

        state.clear();
        gate.notify_one();

        assert!(matches!(pending.await.unwrap(), Err(Error::Stale)));
        assert!(state.is_empty());
        assert!(!state.is_thinking());
    }

    #[tokio::test]
    async fn test_timeout_maps_to_unavailable() {
        let gate = Arc::new(Notify::new());
        let gateway = MockGateway::replying(&["never"]).gated(gate);
        let state = ConversationState::with_config(
            Arc::new(gateway),
            ConversationConfig {
                request_timeout: Duration::from_millis(20),
            },
        );

        match state.submit("slow").await {
            Err(Error::Gateway(GatewayError::Unavailable(reason))) => {
                assert!(reason.contains("timed out"));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(state.len(), 1);
        assert!(!state.is_thinking());
    }

    #[tokio::test]
    async fn test_cancelled_request_releases_pending_flag() {
        let gate = Arc::new(Notify::new());
        let gateway = MockGateway::replying(&["never"]).gated(gate);
        let state = ConversationState::new(Arc::new(gateway));

        let cancelled =
            tokio::time::timeout(Duration::from_millis(10), state.submit("abandon")).await;
        assert!(cancelled.is_err());
        assert!(!state.is_thinking());
    }
}
