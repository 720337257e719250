//! Mutation operations, plus the handlers for stream chunks, scroll samples
//! and context results.
//!
//! History only ever shrinks through `truncate`, which wraps
//! [`MessageStore::truncate_from`](crate::store::MessageStore::truncate_from).

use std::sync::Arc;

use tracing::{debug, info};

use colloquy_common::MessageId;

use crate::backend::{ContextReport, ContextSource, StreamChunk, TurnOptions, TurnRequest};
use crate::context::ContextStatus;
use crate::error::{Operation, SessionError, TransportError};
use crate::ingest::{IngestOutcome, TurnId, TurnStatus};
use crate::message::{Attachment, Message, Role};
use crate::scroll::{ScrollEffect, ScrollState};

use super::{ForkOrigin, Session, SessionController, SessionEvent, TurnStart};

impl SessionController {
    /// Append a user message and open a turn answering it.
    pub fn send(
        &mut self,
        content: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> Result<TurnStart, SessionError> {
        let content = content.into();
        let ctx = self.error_context(Operation::Send);
        if let Some(turn) = self.ingest.active() {
            return Err(SessionError::concurrent_turn(
                ctx.with_message(turn.user_message_id().clone()),
            ));
        }
        if content.trim().is_empty() && attachments.is_empty() {
            return Err(SessionError::invalid(ctx, "the message is empty"));
        }

        let message = Message::user(content).with_attachments(attachments);
        info!(session = %self.session.id, message = %message.id, "message sent");
        self.append(message);
        self.open_turn(self.store.len() - 1, Operation::Send)
    }

    /// Finalize the active turn with a stopped marker, keeping its partial
    /// output. Does nothing when no turn is streaming.
    pub fn stop(&mut self) -> Option<Message> {
        let turn_id = self.ingest.active()?.id();
        let message = self.ingest.stop(Some(turn_id))?;
        self.append(message.clone());
        self.emit(SessionEvent::TurnFinished {
            turn_id,
            status: TurnStatus::Stopped,
            message_id: message.id.clone(),
        });
        Some(message)
    }

    /// Replace a message's content in place. Later history is kept.
    pub fn edit(
        &mut self,
        message_id: &MessageId,
        content: impl Into<String>,
    ) -> Result<(), SessionError> {
        let content = content.into();
        let ctx = self
            .error_context(Operation::Edit)
            .with_message(message_id.clone());
        let Some(index) = self.store.position(message_id) else {
            return Err(SessionError::not_found(ctx));
        };
        if content.trim().is_empty() {
            return Err(SessionError::invalid(ctx, "the new content is empty"));
        }
        if self
            .ingest
            .active()
            .is_some_and(|turn| turn.user_message_id() == message_id)
        {
            return Err(SessionError::invalid(ctx, "its reply is still streaming"));
        }

        self.store
            .set_content(index, content)
            .map_err(|e| SessionError::invalid(ctx, e.to_string()))?;
        if self.store.at(index).is_some_and(|m| m.role == Role::User) {
            self.edited = Some(message_id.clone());
        }
        self.invalidate();
        self.emit(SessionEvent::MessageEdited {
            message_id: message_id.clone(),
        });
        info!(session = %self.session.id, message = %message_id, index, "message edited");
        Ok(())
    }

    /// Drop an assistant reply and everything after it, then answer the
    /// preceding user message again.
    pub fn regenerate(&mut self, message_id: &MessageId) -> Result<TurnStart, SessionError> {
        let ctx = self
            .error_context(Operation::Regenerate)
            .with_message(message_id.clone());
        if self.ingest.is_streaming() {
            return Err(SessionError::concurrent_turn(ctx));
        }
        let Some(index) = self.store.position(message_id) else {
            return Err(SessionError::not_found(ctx));
        };
        if self.store.at(index).is_some_and(|m| m.role != Role::Assistant) {
            return Err(SessionError::invalid(
                ctx,
                "only assistant replies can be regenerated",
            ));
        }
        let answers_user = index
            .checked_sub(1)
            .and_then(|i| self.store.at(i))
            .is_some_and(|m| m.role == Role::User);
        if !answers_user {
            return Err(SessionError::invalid(
                ctx,
                "there is no user message before it",
            ));
        }

        self.truncate(index);
        info!(session = %self.session.id, message = %message_id, index, "regenerating reply");
        self.open_turn(index - 1, Operation::Regenerate)
    }

    /// Copy history up to and including `message_id` into a new session.
    /// The copy shares nothing with this one afterwards.
    pub fn branch(&self, message_id: &MessageId) -> Result<SessionController, SessionError> {
        let ctx = self
            .error_context(Operation::Branch)
            .with_message(message_id.clone());
        let Some(index) = self.store.position(message_id) else {
            return Err(SessionError::not_found(ctx));
        };

        let messages = self.store.get()[..=index].to_vec();
        let mut session = Session::new(self.session.context_budget);
        session.forked_from = Some(ForkOrigin {
            session_id: self.session.id.clone(),
            message_id: message_id.clone(),
        });
        info!(
            session = %self.session.id,
            child = %session.id,
            copied = messages.len(),
            "session branched"
        );

        let mut child =
            SessionController::from_parts(session, messages, self.settings, Arc::clone(&self.policy));
        child.model = self.model.clone();
        Ok(child)
    }

    /// Branch at the point named by the current critical recommendation.
    pub fn fork_from_recommendation(&self) -> Result<SessionController, SessionError> {
        let fork_at = self
            .context
            .status()
            .and_then(|s| s.recommendation.as_ref())
            .and_then(|r| r.fork_at.clone());
        match fork_at {
            Some(message_id) => self.branch(&message_id),
            None => Err(SessionError::invalid(
                self.error_context(Operation::Branch),
                "no fork is recommended",
            )),
        }
    }

    /// Remove a message and everything after it.
    pub fn delete(&mut self, message_id: &MessageId) -> Result<Vec<Message>, SessionError> {
        let ctx = self
            .error_context(Operation::Delete)
            .with_message(message_id.clone());
        let Some(index) = self.store.position(message_id) else {
            return Err(SessionError::not_found(ctx));
        };
        if let Some(turn) = self.ingest.active() {
            let answering = self.store.position(turn.user_message_id());
            if answering.is_some_and(|user_index| index <= user_index) {
                return Err(SessionError::invalid(ctx, "a reply to it is still streaming"));
            }
        }

        let removed = self.truncate(index);
        info!(
            session = %self.session.id,
            message = %message_id,
            removed = removed.len(),
            "messages deleted"
        );
        Ok(removed)
    }

    /// Install persisted history in place of whatever the store holds.
    pub fn load_history(&mut self, messages: Vec<Message>) -> Result<(), SessionError> {
        let ctx = self.error_context(Operation::Load);
        if self.ingest.is_streaming() {
            return Err(SessionError::concurrent_turn(ctx));
        }
        let count = messages.len();
        self.store
            .replace_from(0, messages)
            .map_err(|e| SessionError::invalid(ctx, e.to_string()))?;
        self.edited = None;
        self.invalidate();
        self.emit(SessionEvent::HistoryReplaced { count });
        self.follow_content(false, true);
        debug!(session = %self.session.id, count, "history loaded");
        Ok(())
    }

    /// Apply one chunk from the transport of `turn_id`.
    ///
    /// A chunk carrying an error discards the turn and is returned as
    /// [`SessionError::Transport`]; the store is left as it was.
    pub fn ingest_chunk(
        &mut self,
        turn_id: TurnId,
        chunk: StreamChunk,
    ) -> Result<IngestOutcome, SessionError> {
        let user_message_id = self.turn_user_message(turn_id);
        match self.ingest.ingest(turn_id, chunk) {
            IngestOutcome::Buffered { appended } => {
                if !appended.is_empty() {
                    self.invalidate();
                    self.emit(SessionEvent::Delta {
                        turn_id,
                        text: appended.clone(),
                    });
                    self.follow_content(true, false);
                }
                Ok(IngestOutcome::Buffered { appended })
            }
            IngestOutcome::Completed { appended, message } => {
                if !appended.is_empty() {
                    self.emit(SessionEvent::Delta {
                        turn_id,
                        text: appended.clone(),
                    });
                }
                self.append(message.clone());
                self.emit(SessionEvent::TurnFinished {
                    turn_id,
                    status: TurnStatus::Completed,
                    message_id: message.id.clone(),
                });
                Ok(IngestOutcome::Completed { appended, message })
            }
            IngestOutcome::Failed { error } => Err(self.turn_failed(turn_id, user_message_id, error)),
            IngestOutcome::Stale => Ok(IngestOutcome::Stale),
        }
    }

    /// Discard `turn_id` after a failure outside the chunk stream, such as
    /// the backend refusing the connection. Ignored for finished turns.
    pub fn fail_turn(&mut self, turn_id: TurnId, error: TransportError) -> Result<(), SessionError> {
        let user_message_id = self.turn_user_message(turn_id);
        match self.ingest.fail(turn_id, error) {
            IngestOutcome::Failed { error } => Err(self.turn_failed(turn_id, user_message_id, error)),
            _ => Ok(()),
        }
    }

    pub fn scroll_sample(&mut self, distance_from_bottom: f64) -> ScrollState {
        self.scroll.sample(distance_from_bottom)
    }

    pub fn scroll_up(&mut self) -> ScrollState {
        self.scroll.user_scrolled_up()
    }

    pub fn jump_to_bottom(&mut self) -> ScrollState {
        match self.scroll.jump_to_bottom() {
            ScrollEffect::ScrollToLatest => self.emit(SessionEvent::ScrollToLatest),
        }
        self.scroll.state()
    }

    /// Store revision a context query should be issued for, if the status
    /// is stale and no turn is streaming. Marks the query as outstanding.
    pub fn context_refresh_due(&mut self) -> Option<u64> {
        let revision = self.store.revision();
        if self.ingest.is_streaming() || !self.context.needs_refresh(revision) {
            return None;
        }
        self.context.mark_requested(revision);
        Some(revision)
    }

    /// Like [`Self::context_refresh_due`] but ignores staleness, for
    /// periodic polling while idle.
    pub fn context_poll_due(&mut self) -> Option<u64> {
        if self.ingest.is_streaming() || self.context.request_pending() {
            return None;
        }
        let revision = self.store.revision();
        self.context.mark_requested(revision);
        Some(revision)
    }

    /// Install the outcome of a context query issued at `revision`.
    /// Failures are logged and the previous status is kept.
    pub fn apply_context(
        &mut self,
        revision: u64,
        result: Result<ContextReport, TransportError>,
    ) -> Option<&ContextStatus> {
        match result {
            Ok(report) => {
                let fork_at = self.store.last().map(|m| m.id.clone());
                let applied = self.context.apply(revision, &report, fork_at).cloned();
                if let Some(status) = applied {
                    self.emit(SessionEvent::ContextUpdated(status));
                }
            }
            Err(error) => self
                .context
                .record_failure(&self.session.id, revision, &error),
        }
        self.context.status()
    }

    /// Query `source` directly and apply the result. Returns the current
    /// status without querying while a turn streams.
    pub async fn refresh_context(&mut self, source: &dyn ContextSource) -> Option<ContextStatus> {
        if self.ingest.is_streaming() {
            return self.context.status().cloned();
        }
        let revision = self.store.revision();
        let fork_at = self.store.last().map(|m| m.id.clone());
        let failures = self.context.consecutive_failures();
        let status = self
            .context
            .refresh(source, &self.session.id, revision, fork_at)
            .await
            .cloned();
        if self.context.consecutive_failures() <= failures {
            if let Some(ref status) = status {
                self.emit(SessionEvent::ContextUpdated(status.clone()));
            }
        }
        status
    }

    fn open_turn(
        &mut self,
        user_index: usize,
        operation: Operation,
    ) -> Result<TurnStart, SessionError> {
        let ctx = self.error_context(operation);
        let Some(user) = self.store.at(user_index) else {
            return Err(SessionError::not_found(ctx));
        };
        let user_message_id = user.id.clone();
        let user_content = user.content.clone();

        let handle = self
            .ingest
            .begin_turn(user_message_id.clone(), self.model.clone())
            .map_err(|_| SessionError::concurrent_turn(ctx.with_message(user_message_id.clone())))?;
        if self.edited.as_ref() == Some(&user_message_id) {
            self.edited = None;
        }
        self.invalidate();
        self.emit(SessionEvent::TurnStarted {
            turn_id: handle.id(),
            user_message_id: user_message_id.clone(),
        });

        let request = TurnRequest {
            session_id: self.session.id.clone(),
            user_message_id,
            user_content,
            history: self.store.get()[..=user_index].to_vec(),
            options: TurnOptions {
                model: self.model.clone(),
            },
        };
        Ok(TurnStart { handle, request })
    }

    fn append(&mut self, message: Message) {
        self.store.append(message.clone());
        self.invalidate();
        self.emit(SessionEvent::MessageAppended(message));
        self.follow_content(false, true);
    }

    fn truncate(&mut self, index: usize) -> Vec<Message> {
        let removed = self.store.truncate_from(index);
        if removed.is_empty() {
            return removed;
        }
        if self
            .edited
            .as_ref()
            .is_some_and(|id| removed.iter().any(|m| &m.id == id))
        {
            self.edited = None;
        }
        self.invalidate();
        self.emit(SessionEvent::HistoryTruncated {
            from: index,
            removed: removed.len(),
        });
        removed
    }

    fn turn_user_message(&self, turn_id: TurnId) -> Option<MessageId> {
        self.ingest
            .active()
            .filter(|turn| turn.id() == turn_id)
            .map(|turn| turn.user_message_id().clone())
    }

    fn turn_failed(
        &mut self,
        turn_id: TurnId,
        user_message_id: Option<MessageId>,
        error: TransportError,
    ) -> SessionError {
        let mut ctx = self.error_context(Operation::Ingest);
        if let Some(id) = user_message_id {
            ctx = ctx.with_message(id);
        }
        let err = SessionError::transport(ctx, error);
        self.invalidate();
        self.emit(SessionEvent::TurnFailed {
            turn_id,
            reason: err.user_message(),
        });
        err
    }
}
