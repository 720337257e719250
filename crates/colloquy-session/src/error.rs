//! Error taxonomy for session operations.

use std::fmt;

use colloquy_common::{MessageId, SessionId};

/// The entry point an error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Send,
    Edit,
    Regenerate,
    Branch,
    Delete,
    Ingest,
    Load,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Send => "send",
            Operation::Edit => "edit",
            Operation::Regenerate => "regenerate",
            Operation::Branch => "branch",
            Operation::Delete => "delete",
            Operation::Ingest => "ingest",
            Operation::Load => "load",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an error happened: which session, which message, which operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub session_id: SessionId,
    pub message_id: Option<MessageId>,
    pub operation: Operation,
}

impl ErrorContext {
    pub fn new(session_id: SessionId, operation: Operation) -> Self {
        Self {
            session_id,
            message_id: None,
            operation,
        }
    }

    pub fn with_message(mut self, message_id: MessageId) -> Self {
        self.message_id = Some(message_id);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (session {}", self.operation, self.session_id)?;
        if let Some(ref id) = self.message_id {
            write!(f, ", message {id}")?;
        }
        f.write_str(")")
    }
}

/// Failure reported by the streaming backend or the context endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("timeout")]
    Timeout,
    #[error("rate limited")]
    RateLimited,
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("stream ended before completion")]
    StreamEnded,
}

/// Failure reported by the storage or upload collaborators.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{context}: a turn is already in flight")]
    ConcurrentTurn { context: ErrorContext },

    #[error("{context}: {reason}")]
    InvalidOperand {
        context: ErrorContext,
        reason: String,
    },

    #[error("{context}: {source}")]
    Transport {
        context: ErrorContext,
        #[source]
        source: TransportError,
    },

    #[error("{context}: not found")]
    NotFound { context: ErrorContext },

    #[error("{context}: {source}")]
    Persistence {
        context: ErrorContext,
        #[source]
        source: PersistenceError,
    },

    #[error("session {0} is closed")]
    Closed(SessionId),
}

impl SessionError {
    pub fn concurrent_turn(context: ErrorContext) -> Self {
        Self::ConcurrentTurn { context }
    }

    pub fn invalid(context: ErrorContext, reason: impl Into<String>) -> Self {
        Self::InvalidOperand {
            context,
            reason: reason.into(),
        }
    }

    pub fn not_found(context: ErrorContext) -> Self {
        Self::NotFound { context }
    }

    pub fn transport(context: ErrorContext, source: TransportError) -> Self {
        Self::Transport { context, source }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            SessionError::ConcurrentTurn { context }
            | SessionError::InvalidOperand { context, .. }
            | SessionError::Transport { context, .. }
            | SessionError::NotFound { context }
            | SessionError::Persistence { context, .. } => Some(context),
            SessionError::Closed(_) => None,
        }
    }

    /// A message fit for display. Transport and storage details stay in logs.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::ConcurrentTurn { .. } => {
                "A response is still being generated. Stop it before starting another.".into()
            }
            SessionError::InvalidOperand { context, reason } => {
                format!("Cannot {}: {reason}.", context.operation)
            }
            SessionError::Transport { .. } => {
                "The response failed to arrive. Please try again.".into()
            }
            SessionError::NotFound { context } => match context.message_id {
                Some(_) => format!("Cannot {}: that message no longer exists.", context.operation),
                None => format!("Cannot {}: the conversation no longer exists.", context.operation),
            },
            SessionError::Persistence { .. } => "The conversation could not be saved.".into(),
            SessionError::Closed(_) => "This conversation has been closed.".into(),
        }
    }
}
