//! Notifications emitted by a session as it processes events.

use colloquy_common::MessageId;

use crate::context::ContextStatus;
use crate::ingest::{TurnId, TurnStatus};
use crate::message::Message;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Persisted history was installed.
    HistoryReplaced { count: usize },
    MessageAppended(Message),
    /// Messages at `from` and after were removed.
    HistoryTruncated { from: usize, removed: usize },
    MessageEdited { message_id: MessageId },
    TurnStarted {
        turn_id: TurnId,
        user_message_id: MessageId,
    },
    Delta { turn_id: TurnId, text: String },
    TurnFinished {
        turn_id: TurnId,
        status: TurnStatus,
        message_id: MessageId,
    },
    /// The turn was discarded. `reason` is safe to show to the user.
    TurnFailed { turn_id: TurnId, reason: String },
    ContextUpdated(ContextStatus),
    ScrollToLatest,
}
