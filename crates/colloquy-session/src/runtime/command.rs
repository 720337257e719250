//! Messages understood by a session's owner task.

use tokio::sync::oneshot;

use colloquy_common::MessageId;

use crate::backend::{ContextReport, StreamChunk};
use crate::error::{SessionError, TransportError};
use crate::ingest::TurnId;
use crate::message::{Attachment, Message};
use crate::scroll::ScrollState;

use super::handle::{SessionHandle, SessionSnapshot};

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollAction {
    /// Distance of the viewport from the newest content.
    Sample(f64),
    Up,
    JumpToBottom,
}

pub(crate) enum Command {
    Send {
        content: String,
        attachments: Vec<Attachment>,
        reply: Reply<Result<TurnId, SessionError>>,
    },
    Stop {
        reply: Reply<Option<Message>>,
    },
    Edit {
        message_id: MessageId,
        content: String,
        reply: Reply<Result<(), SessionError>>,
    },
    Regenerate {
        message_id: MessageId,
        reply: Reply<Result<TurnId, SessionError>>,
    },
    /// `at: None` branches where the context monitor recommends.
    Branch {
        at: Option<MessageId>,
        reply: Reply<Result<SessionHandle, SessionError>>,
    },
    Delete {
        message_id: MessageId,
        reply: Reply<Result<Vec<Message>, SessionError>>,
    },
    Scroll {
        action: ScrollAction,
        reply: Reply<ScrollState>,
    },
    Snapshot {
        reply: Reply<SessionSnapshot>,
    },
    Flush {
        reply: Reply<()>,
    },
    Close {
        reply: Reply<()>,
    },

    // Sent by tasks the owner spawned.
    Chunk {
        turn_id: TurnId,
        chunk: StreamChunk,
    },
    StreamFailed {
        turn_id: TurnId,
        error: TransportError,
    },
    StreamEnded {
        turn_id: TurnId,
    },
    ContextResult {
        revision: u64,
        result: Result<ContextReport, TransportError>,
    },
}
