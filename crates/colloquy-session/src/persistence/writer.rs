use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use colloquy_common::SessionId;

use crate::message::Message;

use super::MessageRepository;

#[derive(Debug)]
pub(crate) enum PersistOp {
    Append(Message),
    Rewrite(Vec<Message>),
    /// Answered once every earlier op has been attempted.
    Flush(oneshot::Sender<()>),
}

/// Start the ordered writer for one session. The task ends when the last
/// sender is dropped, after draining what was queued.
pub(crate) fn spawn_writer(
    repository: Arc<dyn MessageRepository>,
    session_id: SessionId,
) -> mpsc::UnboundedSender<PersistOp> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(op) = rx.recv().await {
            let result = match op {
                PersistOp::Append(message) => {
                    repository.persist_message(&session_id, &message).await
                }
                PersistOp::Rewrite(messages) => {
                    repository.save_messages(&session_id, &messages).await
                }
                PersistOp::Flush(done) => {
                    let _ = done.send(());
                    continue;
                }
            };
            if let Err(e) = result {
                warn!(session = %session_id, "failed to persist history: {e}");
            }
        }
        debug!(session = %session_id, "persistence writer stopped");
    });
    tx
}
