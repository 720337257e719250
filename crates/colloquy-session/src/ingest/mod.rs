//! Stream ingest: buffers one in-flight turn and finalizes or discards it.
//!
//! State machine: `idle -> streaming -> {completed, stopped, errored} -> idle`.
//! At most one turn exists at a time. Chunks are applied in sequence order;
//! chunks addressed to a turn that already ended are ignored, so a stop racing
//! a final chunk can only ever produce one message.

mod sequencer;
mod turn;


use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use colloquy_common::{new_correlation_id, MessageId};

use crate::backend::StreamChunk;
use crate::error::TransportError;
use crate::message::{Message, MessageMarker};

pub use sequencer::SequenceOverflow;
pub use turn::{Turn, TurnHandle, TurnId, TurnStatus};

use sequencer::Resequencer;

/// `begin_turn` was called while another turn is streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{active} is still streaming")]
pub struct TurnInFlight {
    pub active: TurnId,
}

/// What applying one chunk did to the active turn.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// The chunk belongs to a turn that is no longer active.
    Stale,
    /// Text newly appended to the buffer; empty while a gap is pending.
    Buffered { appended: String },
    /// The turn finished normally and produced this message.
    Completed { appended: String, message: Message },
    /// The turn was discarded; nothing is to be stored.
    Failed { error: TransportError },
}

#[derive(Debug)]
pub struct StreamIngest {
    active: Option<Turn>,
    next_turn: u64,
    max_pending: usize,
    last_finished: Option<(TurnId, TurnStatus)>,
}

impl StreamIngest {
    pub fn new(max_pending: usize) -> Self {
        Self {
            active: None,
            next_turn: 0,
            max_pending,
            last_finished: None,
        }
    }

    pub fn begin_turn(
        &mut self,
        user_message_id: MessageId,
        model: Option<String>,
    ) -> Result<TurnHandle, TurnInFlight> {
        if let Some(ref turn) = self.active {
            return Err(TurnInFlight { active: turn.id });
        }

        self.next_turn += 1;
        let id = TurnId(self.next_turn);
        let cancel = CancellationToken::new();
        let turn = Turn {
            id,
            user_message_id,
            buffered_text: String::new(),
            status: TurnStatus::Streaming,
            started_at: Utc::now(),
            model,
            correlation_id: new_correlation_id(),
            cancel: cancel.clone(),
            sequencer: Resequencer::new(self.max_pending),
        };
        info!(turn = %id, cid = %turn.correlation_id, "turn started");
        self.active = Some(turn);
        Ok(TurnHandle::new(id, cancel))
    }

    pub fn active(&self) -> Option<&Turn> {
        self.active.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    /// The most recent turn to leave the streaming state, and how it ended.
    pub fn last_finished(&self) -> Option<(TurnId, TurnStatus)> {
        self.last_finished
    }

    pub fn ingest(&mut self, turn_id: TurnId, mut chunk: StreamChunk) -> IngestOutcome {
        let Some(turn) = self.active.as_mut().filter(|t| t.id == turn_id) else {
            debug!(turn = %turn_id, seq = chunk.seq, "ignoring chunk for inactive turn");
            return IngestOutcome::Stale;
        };

        if let Some(error) = chunk.error.take() {
            return self.fail(turn_id, error);
        }

        let ready = match turn.sequencer.push(chunk) {
            Ok(ready) => ready,
            Err(overflow) => {
                return self.fail(turn_id, TransportError::Protocol(overflow.to_string()));
            }
        };

        let mut appended = String::new();
        let mut finished = false;
        for mut chunk in ready {
            if let Some(error) = chunk.error.take() {
                return self.fail(turn_id, error);
            }
            appended.push_str(&chunk.delta);
            if chunk.is_final {
                finished = true;
                break;
            }
        }
        turn.buffered_text.push_str(&appended);
        debug!(
            turn = %turn_id,
            appended = appended.len(),
            held = turn.sequencer.held(),
            "chunk applied"
        );

        if finished {
            return match self.finish(TurnStatus::Completed) {
                Some(message) => IngestOutcome::Completed { appended, message },
                None => IngestOutcome::Stale,
            };
        }
        IngestOutcome::Buffered { appended }
    }

    /// Finalize the active turn as stopped, keeping its partial output.
    ///
    /// Idempotent: returns `None` when there is nothing to stop, or when
    /// `turn_id` names a turn that has already ended.
    pub fn stop(&mut self, turn_id: Option<TurnId>) -> Option<Message> {
        let active = self.active.as_ref()?;
        if turn_id.is_some_and(|id| id != active.id) {
            return None;
        }
        self.finish(TurnStatus::Stopped)
    }

    /// Discard the turn after a transport failure. No message is produced.
    pub fn fail(&mut self, turn_id: TurnId, error: TransportError) -> IngestOutcome {
        match self.active.take_if(|t| t.id == turn_id) {
            Some(mut turn) => {
                turn.status = TurnStatus::Errored;
                turn.cancel.cancel();
                warn!(
                    turn = %turn.id,
                    cid = %turn.correlation_id,
                    buffered = turn.buffered_text.len(),
                    "turn discarded: {error}"
                );
                self.last_finished = Some((turn.id, TurnStatus::Errored));
                IngestOutcome::Failed { error }
            }
            None => IngestOutcome::Stale,
        }
    }

    fn finish(&mut self, status: TurnStatus) -> Option<Message> {
        let mut turn = self.active.take()?;
        turn.status = status;
        turn.cancel.cancel();

        let mut message = Message::assistant(std::mem::take(&mut turn.buffered_text));
        message.model = turn.model.take();
        if status == TurnStatus::Stopped {
            message.marker = Some(MessageMarker::Stopped);
        }

        info!(
            turn = %turn.id,
            cid = %turn.correlation_id,
            ?status,
            chars = message.content.len(),
            "turn finalized"
        );
        self.last_finished = Some((turn.id, status));
        Some(message)
    }
}
