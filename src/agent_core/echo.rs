//! Echo chatbot: canned replies that quote the user's input.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;

use crate::storage::{ChatMessageRecord, NewChatMessage, StoreError, WorkspaceStore};

const TEMPLATES: [&str; 5] = [
    "I understand you're asking about \"{input}\". Let me help you with that.",
    "That's an interesting question about \"{input}\". Here's what I think...",
    "Thanks for sharing \"{input}\". Based on that, I would suggest...",
    "I've analyzed your request regarding \"{input}\". Here's my response...",
    "Great question! Regarding \"{input}\", I can provide some insights...",
];

/// Picks a reply template at random.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoResponder;

impl EchoResponder {
    pub fn respond(&self, input: &str) -> String {
        let template = TEMPLATES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(TEMPLATES[0]);
        template.replace("{input}", input)
    }
}

/// A persisted echo chat session.
pub struct EchoChat {
    store: Arc<dyn WorkspaceStore>,
    session_id: String,
    delay: Duration,
    responder: EchoResponder,
    messages: Vec<ChatMessageRecord>,
}

impl EchoChat {
    pub fn new(store: Arc<dyn WorkspaceStore>, session_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            store,
            session_id: session_id.into(),
            delay,
            responder: EchoResponder,
            messages: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[ChatMessageRecord] {
        &self.messages
    }

    pub async fn load_history(&mut self) -> Result<(), StoreError> {
        self.messages = self.store.list_messages(&self.session_id).await?;
        Ok(())
    }

    /// Store the input, wait, store and return the reply. Blank input yields `None`.
    pub async fn submit(&mut self, input: &str) -> Result<Option<ChatMessageRecord>, StoreError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        let user = self
            .store
            .insert_message(&NewChatMessage::user(&self.session_id, input))
            .await?;
        self.messages.push(user);

        tokio::time::sleep(self.delay).await;

        let reply = self.responder.respond(input);
        let assistant = self
            .store
            .insert_message(&NewChatMessage::assistant(&self.session_id, reply, None))
            .await?;
        self.messages.push(assistant.clone());
        tracing::debug!(session_id = %self.session_id, "echo reply stored");
        Ok(Some(assistant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::types::Role;
    use crate::storage::SqliteStore;

    #[test]
    fn test_reply_quotes_input() {
        let reply = EchoResponder.respond("rust traits");
        assert!(reply.contains("\"rust traits\""));
        let known = TEMPLATES
            .iter()
            .any(|t| t.replace("{input}", "rust traits") == reply);
        assert!(known);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_waits_then_stores_reply() {
        let store = Arc::new(SqliteStore::open(":memory:").unwrap());
        let mut chat = EchoChat::new(store.clone(), "echo-session", Duration::from_millis(1000));

        let started = tokio::time::Instant::now();
        let reply = chat.submit("hello").await.unwrap().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1000));

        assert_eq!(reply.role, Role::Assistant);
        assert!(reply.content.contains("\"hello\""));

        let stored = store.list_messages("echo-session").await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].content, "hello");
        assert_eq!(chat.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_input_ignored() {
        let store = Arc::new(SqliteStore::open(":memory:").unwrap());
        let mut chat = EchoChat::new(store.clone(), "s", Duration::ZERO);
        assert!(chat.submit("  ").await.unwrap().is_none());
        assert!(store.list_messages("s").await.unwrap().is_empty());
    }
}
