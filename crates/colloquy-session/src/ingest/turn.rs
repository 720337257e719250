//! The transient in-flight turn and the handle given to its transport.

use std::fmt;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use colloquy_common::MessageId;

use crate::backend::ChunkStream;

use super::sequencer::Resequencer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub(crate) u64);

impl TurnId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Streaming,
    Stopped,
    Errored,
    Completed,
}

/// One in-flight request/response exchange.
#[derive(Debug)]
pub struct Turn {
    pub(crate) id: TurnId,
    pub(crate) user_message_id: MessageId,
    pub(crate) buffered_text: String,
    pub(crate) status: TurnStatus,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) model: Option<String>,
    pub(crate) correlation_id: String,
    pub(crate) cancel: CancellationToken,
    pub(crate) sequencer: Resequencer,
}

impl Turn {
    pub fn id(&self) -> TurnId {
        self.id
    }

    pub fn user_message_id(&self) -> &MessageId {
        &self.user_message_id
    }

    pub fn buffered_text(&self) -> &str {
        &self.buffered_text
    }

    pub fn status(&self) -> TurnStatus {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn is_streaming(&self) -> bool {
        self.status == TurnStatus::Streaming
    }
}

/// Handle for the transport side of a turn.
///
/// Shares the turn's cancellation token, so stopping the turn also ends any
/// stream wrapped with [`TurnHandle::guard`].
#[derive(Debug, Clone)]
pub struct TurnHandle {
    id: TurnId,
    cancel: CancellationToken,
}

impl TurnHandle {
    pub(crate) fn new(id: TurnId, cancel: CancellationToken) -> Self {
        Self { id, cancel }
    }

    pub fn id(&self) -> TurnId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wrap a backend stream so it ends as soon as the turn is cancelled.
    /// The result is finite and cannot be restarted.
    pub fn guard(&self, stream: ChunkStream) -> ChunkStream {
        stream
            .take_until(self.cancel.clone().cancelled_owned())
            .boxed()
    }
}
