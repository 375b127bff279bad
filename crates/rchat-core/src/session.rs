//! A chat session: conversation, search history and speech input together

use crate::{
    conversation::ConversationState,
    error::Result,
    history::HistoryStore,
    message::Message,
    speech::SpeechInput,
};
use parking_lot::Mutex;

/// Ties one conversation to the persisted history and a speech input.
pub struct ChatSession {
    conversation: ConversationState,
    history: Mutex<HistoryStore>,
    speech: SpeechInput,
}

impl ChatSession {
    pub fn new(conversation: ConversationState, history: HistoryStore, speech: SpeechInput) -> Self {
        Self {
            conversation,
            history: Mutex::new(history),
            speech,
        }
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn speech(&self) -> &SpeechInput {
        &self.speech
    }

    /// Submit user input.
    ///
    /// Blank input is ignored and returns `Ok(None)`. Otherwise the raw text
    /// is recorded in history once the request slot is taken, so it is kept
    /// when the gateway fails and skipped when the conversation is busy.
    pub async fn submit(&self, input: &str) -> Result<Option<Message>> {
        let text = input.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let guard = self.conversation.claim()?;
        self.history.lock().append(input);
        self.conversation.submit_claimed(guard, text).await.map(Some)
    }

    /// Edit an earlier user message and regenerate its reply. History is not touched.
    pub async fn edit_and_regenerate(&self, index: usize, new_text: &str) -> Result<Vec<Message>> {
        self.conversation.edit_and_regenerate(index, new_text).await
    }

    /// Snapshot of the history entries
    pub fn history(&self) -> Vec<String> {
        self.history.lock().entries().to_vec()
    }

    /// Remove one history entry
    pub fn delete_history(&self, index: usize) -> Result<String> {
        self.history.lock().delete_at(index)
    }

    /// Remove every history entry
    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Empty the conversation; history is kept
    pub fn clear_conversation(&self) {
        self.conversation.clear();
    }

    /// Capture one spoken query. The transcript is returned for the input
    /// box; nothing is submitted.
    pub async fn capture_speech(&self) -> Result<String> {
        self.speech.start().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::tests::MockGateway;
    use crate::error::Error;
    use crate::storage::MemorySlot;
    use rchat_ai::GatewayError;
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn session(gateway: MockGateway, slot: MemorySlot) -> ChatSession {
        ChatSession::new(
            ConversationState::new(Arc::new(gateway)),
            HistoryStore::load(slot),
            SpeechInput::unsupported(),
        )
    }

    #[tokio::test]
    async fn test_submit_records_history_and_reply() {
        let slot = MemorySlot::new();
        let session = session(MockGateway::replying(&["Rust is a language."]), slot.clone());

        let reply = session.submit("What is Rust?").await.unwrap().unwrap();
        assert_eq!(reply.text, "Rust is a language.");
        assert_eq!(session.conversation().len(), 2);
        assert_eq!(session.history(), vec!["What is Rust?".to_string()]);
        assert_eq!(slot.payload().as_deref(), Some(r#"["What is Rust?"]"#));
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let gateway = Arc::new(MockGateway::replying(&["unused"]));
        let session = ChatSession::new(
            ConversationState::new(gateway.clone()),
            HistoryStore::load(MemorySlot::new()),
            SpeechInput::unsupported(),
        );

        assert!(session.submit("   \n").await.unwrap().is_none());
        assert!(session.conversation().is_empty());
        assert!(session.history().is_empty());
        assert!(gateway.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_failed_request_still_records_history() {
        let session = session(
            MockGateway::new(vec![Err(GatewayError::unavailable("offline"))]),
            MemorySlot::new(),
        );

        assert!(session.submit("hello").await.is_err());
        assert_eq!(session.history(), vec!["hello".to_string()]);
        assert_eq!(session.conversation().len(), 1);
    }

    #[tokio::test]
    async fn test_busy_submit_leaves_history_alone() {
        let gate = Arc::new(Notify::new());
        let session = Arc::new(session(
            MockGateway::replying(&["first"]).gated(gate.clone()),
            MemorySlot::new(),
        ));

        let pending = {
            let session = session.clone();
            tokio::spawn(async move { session.submit("one").await })
        };
        while !session.conversation().is_thinking() {
            tokio::task::yield_now().await;
        }

        assert!(matches!(session.submit("two").await, Err(Error::Busy)));
        assert_eq!(session.history(), vec!["one".to_string()]);

        gate.notify_one();
        assert!(pending.await.unwrap().is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submits_record_only_the_accepted_one() {
        let gate = Arc::new(Notify::new());
        let slot = MemorySlot::new();
        let session = Arc::new(session(
            MockGateway::replying(&["only"]).gated(gate.clone()),
            slot.clone(),
        ));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let session = session.clone();
                tokio::spawn(async move { session.submit(&format!("q{}", i)).await })
            })
            .collect();
        while tasks.iter().filter(|t| t.is_finished()).count() < tasks.len() - 1 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();

        let mut accepted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(Some(_)) => accepted += 1,
                Err(Error::Busy) => {}
                other => panic!("unexpected result: {:?}", other),
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.conversation().len(), 2);
    }

    #[tokio::test]
    async fn test_edit_does_not_touch_history() {
        let session = session(MockGateway::replying(&["a1", "a2"]), MemorySlot::new());
        session.submit("A").await.unwrap();

        let snapshot = session.edit_and_regenerate(0, "A2").await.unwrap();
        assert_eq!(snapshot[0].text, "A2");
        assert_eq!(snapshot[1].text, "a2");
        assert_eq!(session.history(), vec!["A".to_string()]);
    }

    #[tokio::test]
    async fn test_history_delete_and_clear() {
        let slot = MemorySlot::with_payload(r#"["a","b","c"]"#);
        let session = session(MockGateway::replying(&[]), slot.clone());

        assert_eq!(session.delete_history(1).unwrap(), "b");
        assert!(matches!(
            session.delete_history(7),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert_eq!(session.history(), vec!["a".to_string(), "c".to_string()]);

        session.clear_history();
        assert!(session.history().is_empty());
        assert_eq!(slot.payload().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_clear_conversation_keeps_history() {
        let session = session(MockGateway::replying(&["hi"]), MemorySlot::new());
        session.submit("hello").await.unwrap();

        session.clear_conversation();
        assert!(session.conversation().is_empty());
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn test_speech_without_backend() {
        let session = session(MockGateway::replying(&[]), MemorySlot::new());
        assert!(matches!(session.capture_speech().await, Err(Error::Speech(_))));
        assert!(matches!(
            session.capture_speech().await,
            Err(Error::SpeechDisabled)
        ));
    }
}
