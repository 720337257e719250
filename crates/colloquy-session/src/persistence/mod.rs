//! Storage collaborator: where finalized history lives between runs.
//!
//! Writes are issued from one background task per session, so they reach
//! the repository in the order the store changed.

mod json_dir;
mod memory;
mod writer;

use async_trait::async_trait;

use colloquy_common::SessionId;

use crate::error::PersistenceError;
use crate::message::Message;

pub use json_dir::JsonDirRepository;
pub use memory::InMemoryRepository;

pub(crate) use writer::{spawn_writer, PersistOp};

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Record one newly finalized message at the end of the history.
    async fn persist_message(
        &self,
        session_id: &SessionId,
        message: &Message,
    ) -> Result<(), PersistenceError>;

    /// Replace the stored history wholesale, after a truncation or edit.
    async fn save_messages(
        &self,
        session_id: &SessionId,
        messages: &[Message],
    ) -> Result<(), PersistenceError>;

    /// Stored history, oldest first. Unknown sessions have none.
    async fn load_messages(&self, session_id: &SessionId) -> Result<Vec<Message>, PersistenceError>;
}
