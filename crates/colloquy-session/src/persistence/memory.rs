use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use colloquy_common::SessionId;

use crate::error::PersistenceError;
use crate::message::Message;

use super::MessageRepository;

/// Keeps histories in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    sessions: Mutex<HashMap<SessionId, Vec<Message>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[async_trait]
impl MessageRepository for InMemoryRepository {
    async fn persist_message(
        &self,
        session_id: &SessionId,
        message: &Message,
    ) -> Result<(), PersistenceError> {
        self.sessions
            .lock()
            .await
            .entry(session_id.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn save_messages(
        &self,
        session_id: &SessionId,
        messages: &[Message],
    ) -> Result<(), PersistenceError> {
        self.sessions
            .lock()
            .await
            .insert(session_id.clone(), messages.to_vec());
        Ok(())
    }

    async fn load_messages(&self, session_id: &SessionId) -> Result<Vec<Message>, PersistenceError> {
        Ok(self
            .sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_then_rewrite() {
        let repo = InMemoryRepository::new();
        let id = SessionId::from("s1");
        repo.persist_message(&id, &Message::user("a")).await.unwrap();
        repo.persist_message(&id, &Message::assistant("b")).await.unwrap();
        assert_eq!(repo.load_messages(&id).await.unwrap().len(), 2);

        repo.save_messages(&id, &[Message::user("only")]).await.unwrap();
        let loaded = repo.load_messages(&id).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].content, "only");
    }

    #[tokio::test]
    async fn unknown_session_is_empty() {
        let repo = InMemoryRepository::new();
        assert!(repo
            .load_messages(&SessionId::from("nope"))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(repo.session_count().await, 0);
    }
}
