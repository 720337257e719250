//! The owner task: applies commands to one controller, in order.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{TurnBackend, TurnRequest};
use crate::controller::{SessionController, SessionEvent, TurnStart};
use crate::error::TransportError;
use crate::ingest::{TurnHandle, TurnId};
use crate::persistence::PersistOp;

use super::command::{Command, ScrollAction};
use super::handle::{SessionHandle, SessionSnapshot};
use super::SessionServices;

pub(crate) struct SessionActor {
    controller: SessionController,
    services: SessionServices,
    events: broadcast::Sender<SessionEvent>,
    /// Weak so that spawned tasks never keep a closed session alive.
    commands: mpsc::WeakSender<Command>,
    writer: mpsc::UnboundedSender<PersistOp>,
    shutdown: CancellationToken,
}

impl SessionActor {
    pub(crate) fn new(
        controller: SessionController,
        services: SessionServices,
        events: broadcast::Sender<SessionEvent>,
        commands: mpsc::WeakSender<Command>,
        writer: mpsc::UnboundedSender<PersistOp>,
    ) -> Self {
        Self {
            controller,
            services,
            events,
            commands,
            writer,
            shutdown: CancellationToken::new(),
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let session_id = self.controller.id().clone();
        info!(session = %session_id, messages = self.controller.messages().len(), "session started");

        let mut poll = self.services.settings.poll_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        self.settle();
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Close { reply }) => {
                        self.close();
                        // Answered by the writer once queued writes are done.
                        let _ = self.writer.send(PersistOp::Flush(reply));
                        break;
                    }
                    Some(command) => {
                        self.handle(command);
                        self.settle();
                    }
                    None => {
                        self.close();
                        break;
                    }
                },
                _ = next_tick(&mut poll) => {
                    if let Some(revision) = self.controller.context_poll_due() {
                        debug!(session = %session_id, revision, "polling context status");
                        self.query_context(revision);
                    }
                }
            }
        }
        info!(session = %session_id, "session closed");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Send {
                content,
                attachments,
                reply,
            } => {
                let result = match self.controller.send(content, attachments) {
                    Ok(start) => Ok(self.start_stream(start)),
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            Command::Stop { reply } => {
                let _ = reply.send(self.controller.stop());
            }
            Command::Edit {
                message_id,
                content,
                reply,
            } => {
                let _ = reply.send(self.controller.edit(&message_id, content));
            }
            Command::Regenerate { message_id, reply } => {
                let result = match self.controller.regenerate(&message_id) {
                    Ok(start) => Ok(self.start_stream(start)),
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            Command::Branch { at, reply } => {
                let child = match at {
                    Some(message_id) => self.controller.branch(&message_id),
                    None => self.controller.fork_from_recommendation(),
                };
                let result =
                    child.map(|child| SessionHandle::spawn_branch(child, self.services.clone()));
                let _ = reply.send(result);
            }
            Command::Delete { message_id, reply } => {
                let _ = reply.send(self.controller.delete(&message_id));
            }
            Command::Scroll { action, reply } => {
                let state = match action {
                    ScrollAction::Sample(distance) => self.controller.scroll_sample(distance),
                    ScrollAction::Up => self.controller.scroll_up(),
                    ScrollAction::JumpToBottom => self.controller.jump_to_bottom(),
                };
                let _ = reply.send(state);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(SessionSnapshot::of(&self.controller));
            }
            Command::Flush { reply } => {
                let _ = self.writer.send(PersistOp::Flush(reply));
            }
            Command::Close { reply } => {
                let _ = reply.send(());
            }
            Command::Chunk { turn_id, chunk } => {
                if let Err(e) = self.controller.ingest_chunk(turn_id, chunk) {
                    warn!("{e}");
                }
            }
            Command::StreamFailed { turn_id, error } => {
                if let Err(e) = self.controller.fail_turn(turn_id, error) {
                    warn!("{e}");
                }
            }
            Command::StreamEnded { turn_id } => {
                if let Err(e) = self.controller.fail_turn(turn_id, TransportError::StreamEnded) {
                    warn!("{e}");
                }
            }
            Command::ContextResult { revision, result } => {
                self.controller.apply_context(revision, result);
            }
        }
    }

    /// Publish and persist what the last command changed, then query the
    /// context endpoint if the status went stale.
    fn settle(&mut self) {
        self.publish();
        if let Some(revision) = self.controller.context_refresh_due() {
            self.query_context(revision);
        }
    }

    fn publish(&mut self) {
        let events = self.controller.drain_events();
        if events.is_empty() {
            return;
        }
        for op in self.persist_ops(&events) {
            if self.writer.send(op).is_err() {
                warn!(session = %self.controller.id(), "persistence writer is gone");
                break;
            }
        }
        for event in events {
            let _ = self.events.send(event);
        }
    }

    fn persist_ops(&self, events: &[SessionEvent]) -> Vec<PersistOp> {
        let rewrite = events.iter().any(|e| {
            matches!(
                e,
                SessionEvent::HistoryTruncated { .. } | SessionEvent::MessageEdited { .. }
            )
        });
        if rewrite {
            return vec![PersistOp::Rewrite(self.controller.messages().to_vec())];
        }
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::MessageAppended(message) => Some(PersistOp::Append(message.clone())),
                _ => None,
            })
            .collect()
    }

    fn start_stream(&self, start: TurnStart) -> TurnId {
        let TurnStart { handle, request } = start;
        let turn_id = handle.id();
        tokio::spawn(forward_stream(
            Arc::clone(&self.services.backend),
            handle,
            request,
            self.commands.clone(),
        ));
        turn_id
    }

    fn query_context(&self, revision: u64) {
        let source = Arc::clone(&self.services.context);
        let session_id = self.controller.id().clone();
        let commands = self.commands.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = shutdown.cancelled() => return,
                result = source.context_status(&session_id) => result,
            };
            deliver(&commands, Command::ContextResult { revision, result }).await;
        });
    }

    fn close(&mut self) {
        if self.controller.stop().is_some() {
            info!(session = %self.controller.id(), "stopped in-flight turn on close");
        }
        self.publish();
        self.shutdown.cancel();
    }
}

/// Open the backend stream for a turn and relay its chunks to the owner.
/// Ends early when the turn is cancelled.
async fn forward_stream(
    backend: Arc<dyn TurnBackend>,
    handle: TurnHandle,
    request: TurnRequest,
    commands: mpsc::WeakSender<Command>,
) {
    let turn_id = handle.id();
    let cancel = handle.cancellation_token();
    let opened = tokio::select! {
        _ = cancel.cancelled() => return,
        opened = backend.start_turn(request) => opened,
    };
    let stream = match opened {
        Ok(stream) => stream,
        Err(error) => {
            deliver(&commands, Command::StreamFailed { turn_id, error }).await;
            return;
        }
    };

    let mut chunks = handle.guard(stream);
    while let Some(chunk) = chunks.next().await {
        if !deliver(&commands, Command::Chunk { turn_id, chunk }).await {
            return;
        }
    }
    if !handle.is_cancelled() {
        deliver(&commands, Command::StreamEnded { turn_id }).await;
    }
}

async fn deliver(commands: &mpsc::WeakSender<Command>, command: Command) -> bool {
    match commands.upgrade() {
        Some(tx) => tx.send(command).await.is_ok(),
        None => false,
    }
}

async fn next_tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
