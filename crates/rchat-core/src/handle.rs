//! A cloneable handle for observing the conversation from external code.

use crate::events::ConversationEvent;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::broadcast;

/// A cloneable handle for observing the conversation from external code.
///
/// All fields are `Arc`-wrapped (or are channel senders), so cloning is cheap.
#[derive(Clone)]
pub struct ConversationHandle {
    pub(crate) thinking: Arc<AtomicBool>,
    pub(crate) event_tx: broadcast::Sender<ConversationEvent>,
}

impl ConversationHandle {
    pub(crate) fn new(event_tx: broadcast::Sender<ConversationEvent>) -> Self {
        Self {
            thinking: Arc::new(AtomicBool::new(false)),
            event_tx,
        }
    }

    /// Claim the single in-flight slot. `None` when a request is already pending.
    pub(crate) fn try_begin(&self) -> Option<PendingGuard> {
        self.thinking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let _ = self
            .event_tx
            .send(ConversationEvent::ThinkingChanged { thinking: true });
        Some(PendingGuard {
            handle: self.clone(),
        })
    }

    /// Whether a gateway call is outstanding.
    pub fn is_thinking(&self) -> bool {
        self.thinking.load(Ordering::Acquire)
    }

    /// Subscribe to conversation events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.event_tx.subscribe()
    }
}

/// Holds the pending flag for one request and releases it on drop,
/// including when the request future is cancelled.
pub(crate) struct PendingGuard {
    handle: ConversationHandle,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.handle.thinking.store(false, Ordering::Release);
        let _ = self
            .handle
            .event_tx
            .send(ConversationEvent::ThinkingChanged { thinking: false });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> ConversationHandle {
        let (tx, _) = broadcast::channel(16);
        ConversationHandle::new(tx)
    }

    #[test]
    fn test_only_one_guard_at_a_time() {
        let handle = handle();
        let guard = handle.try_begin();
        assert!(guard.is_some());
        assert!(handle.is_thinking());
        assert!(handle.try_begin().is_none());

        drop(guard);
        assert!(!handle.is_thinking());
        assert!(handle.try_begin().is_some());
    }

    #[test]
    fn test_guard_emits_thinking_events() {
        let handle = handle();
        let mut rx = handle.subscribe();
        drop(handle.try_begin());

        assert_eq!(
            rx.try_recv().unwrap(),
            ConversationEvent::ThinkingChanged { thinking: true }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            ConversationEvent::ThinkingChanged { thinking: false }
        );
    }
}
