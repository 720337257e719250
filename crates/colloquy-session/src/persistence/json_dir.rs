//! One pretty-printed JSON file per session under a data directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use colloquy_common::SessionId;
use colloquy_config::StorageConfig;

use crate::error::PersistenceError;
use crate::message::Message;

use super::MessageRepository;

#[derive(Debug, Clone)]
pub struct JsonDirRepository {
    dir: PathBuf,
}

impl JsonDirRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data_dir>/colloquy/sessions`, or the configured override.
    pub fn from_config(config: &StorageConfig) -> Result<Self, PersistenceError> {
        config
            .directory
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("colloquy").join("sessions")))
            .map(Self::new)
            .ok_or_else(|| PersistenceError::Unavailable("could not determine data directory".into()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, session_id: &SessionId) -> Result<PathBuf, PersistenceError> {
        let id = session_id.as_str();
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(PersistenceError::Unavailable(format!(
                "session id {id:?} is not a valid file name"
            )));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    async fn write(&self, session_id: &SessionId, messages: &[Message]) -> Result<(), PersistenceError> {
        let path = self.path_for(session_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(messages)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(session = %session_id, count = messages.len(), "history written to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for JsonDirRepository {
    async fn persist_message(
        &self,
        session_id: &SessionId,
        message: &Message,
    ) -> Result<(), PersistenceError> {
        let mut messages = self.load_messages(session_id).await?;
        messages.push(message.clone());
        self.write(session_id, &messages).await
    }

    async fn save_messages(
        &self,
        session_id: &SessionId,
        messages: &[Message],
    ) -> Result<(), PersistenceError> {
        self.write(session_id, messages).await
    }

    async fn load_messages(&self, session_id: &SessionId) -> Result<Vec<Message>, PersistenceError> {
        let path = self.path_for(session_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}
