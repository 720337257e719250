//! Public handle for a running session.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use colloquy_common::{MessageId, SessionId};

use crate::activity::Activity;
use crate::backend::PendingAttachment;
use crate::context::ContextStatus;
use crate::controller::{Session, SessionController, SessionEvent};
use crate::error::{ErrorContext, Operation, SessionError};
use crate::ingest::TurnId;
use crate::message::Message;
use crate::persistence::{spawn_writer, PersistOp};
use crate::scroll::ScrollState;

use super::actor::SessionActor;
use super::command::{Command, ScrollAction};
use super::{SessionServices, COMMAND_CAPACITY};

/// Everything the presentation layer reads, captured at one instant.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session: Session,
    pub messages: Vec<Message>,
    pub activities: Vec<Activity>,
    pub context: Option<ContextStatus>,
    pub scroll: ScrollState,
    /// Partial text of the reply being streamed.
    pub streaming: Option<String>,
    pub edited: Option<MessageId>,
}

impl SessionSnapshot {
    pub(crate) fn of(controller: &SessionController) -> Self {
        Self {
            session: controller.session().clone(),
            messages: controller.messages().to_vec(),
            activities: controller.activities().to_vec(),
            context: controller.context_status().cloned(),
            scroll: controller.scroll_state(),
            streaming: controller
                .active_turn()
                .map(|turn| turn.buffered_text().to_string()),
            edited: controller.edited_message().cloned(),
        }
    }
}

/// Handle for talking to a session's owner task.
///
/// Cheap to clone. The owner task exits after [`SessionHandle::close`] or
/// once every handle has been dropped.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<SessionEvent>,
    services: SessionServices,
}

impl SessionHandle {
    /// Start an owner task for `controller` as it is.
    pub fn spawn(controller: SessionController, services: SessionServices) -> Self {
        Self::spawn_with(controller, services, None)
    }

    /// Load the stored history of the controller's session, then start it.
    pub async fn open(
        mut controller: SessionController,
        services: SessionServices,
    ) -> Result<Self, SessionError> {
        let messages = services
            .repository
            .load_messages(controller.id())
            .await
            .map_err(|source| SessionError::Persistence {
                context: ErrorContext::new(controller.id().clone(), Operation::Load),
                source,
            })?;
        if !messages.is_empty() {
            controller.load_history(messages)?;
        }
        Ok(Self::spawn(controller, services))
    }

    /// Start a branched session and write its copied history.
    pub(crate) fn spawn_branch(controller: SessionController, services: SessionServices) -> Self {
        let initial = PersistOp::Rewrite(controller.messages().to_vec());
        Self::spawn_with(controller, services, Some(initial))
    }

    fn spawn_with(
        controller: SessionController,
        services: SessionServices,
        initial: Option<PersistOp>,
    ) -> Self {
        let id = controller.id().clone();
        let (commands, receiver) = mpsc::channel(COMMAND_CAPACITY);
        let (events, _) = broadcast::channel(services.settings.event_capacity);

        let writer = spawn_writer(Arc::clone(&services.repository), id.clone());
        if let Some(op) = initial {
            let _ = writer.send(op);
        }

        let actor = SessionActor::new(
            controller,
            services.clone(),
            events.clone(),
            commands.downgrade(),
            writer,
        );
        tokio::spawn(actor.run(receiver));

        Self {
            id,
            commands,
            events,
            services,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn send(&self, content: impl Into<String>) -> Result<TurnId, SessionError> {
        let content = content.into();
        self.request(|reply| Command::Send {
            content,
            attachments: Vec::new(),
            reply,
        })
        .await?
    }

    /// Upload `files`, then send. Nothing is sent if any upload fails.
    pub async fn send_with_attachments(
        &self,
        content: impl Into<String>,
        files: Vec<PendingAttachment>,
    ) -> Result<TurnId, SessionError> {
        let content = content.into();
        if files.is_empty() {
            return self.send(content).await;
        }
        let Some(uploader) = self.services.uploader.as_ref() else {
            return Err(SessionError::invalid(
                self.context(Operation::Send),
                "attachments are not supported",
            ));
        };

        let mut attachments = Vec::with_capacity(files.len());
        for file in files {
            let name = file.name.clone();
            let attachment = uploader.upload_attachment(file).await.map_err(|source| {
                SessionError::Persistence {
                    context: self.context(Operation::Send),
                    source,
                }
            })?;
            debug!(session = %self.id, name, "attachment uploaded");
            attachments.push(attachment);
        }

        self.request(|reply| Command::Send {
            content,
            attachments,
            reply,
        })
        .await?
    }

    /// Stop the streaming turn. `None` if nothing was streaming.
    pub async fn stop(&self) -> Result<Option<Message>, SessionError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    pub async fn edit(
        &self,
        message_id: &MessageId,
        content: impl Into<String>,
    ) -> Result<(), SessionError> {
        let content = content.into();
        self.request(|reply| Command::Edit {
            message_id: message_id.clone(),
            content,
            reply,
        })
        .await?
    }

    pub async fn regenerate(&self, message_id: &MessageId) -> Result<TurnId, SessionError> {
        self.request(|reply| Command::Regenerate {
            message_id: message_id.clone(),
            reply,
        })
        .await?
    }

    /// Copy history up to `message_id` into a new, independently running session.
    pub async fn branch(&self, message_id: &MessageId) -> Result<SessionHandle, SessionError> {
        self.request(|reply| Command::Branch {
            at: Some(message_id.clone()),
            reply,
        })
        .await?
    }

    /// Accept the fork suggested by a critical context status.
    pub async fn fork_from_recommendation(&self) -> Result<SessionHandle, SessionError> {
        self.request(|reply| Command::Branch { at: None, reply })
            .await?
    }

    pub async fn delete(&self, message_id: &MessageId) -> Result<Vec<Message>, SessionError> {
        self.request(|reply| Command::Delete {
            message_id: message_id.clone(),
            reply,
        })
        .await?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn messages(&self) -> Result<Vec<Message>, SessionError> {
        Ok(self.snapshot().await?.messages)
    }

    pub async fn activities(&self) -> Result<Vec<Activity>, SessionError> {
        Ok(self.snapshot().await?.activities)
    }

    pub async fn context_status(&self) -> Result<Option<ContextStatus>, SessionError> {
        Ok(self.snapshot().await?.context)
    }

    pub async fn scroll_state(&self) -> Result<ScrollState, SessionError> {
        Ok(self.snapshot().await?.scroll)
    }

    pub async fn scroll(&self, action: ScrollAction) -> Result<ScrollState, SessionError> {
        self.request(|reply| Command::Scroll { action, reply }).await
    }

    /// Wait until every change made so far has reached the repository.
    pub async fn flush(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Flush { reply }).await
    }

    /// Stop any streaming turn, write pending history and end the owner task.
    pub async fn close(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Close { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::Closed(self.id.clone()))?;
        response
            .await
            .map_err(|_| SessionError::Closed(self.id.clone()))
    }

    fn context(&self, operation: Operation) -> ErrorContext {
        ErrorContext::new(self.id.clone(), operation)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}
