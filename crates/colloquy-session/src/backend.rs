//! Contracts consumed from collaborators: the streaming AI backend, the
//! context budget endpoint and the attachment uploader.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use colloquy_common::{MessageId, SessionId};

use crate::error::{PersistenceError, TransportError};
use crate::message::{Attachment, Message};

/// One unit of a streamed response.
///
/// `seq` is the transport's send order, starting at 0 for each turn. A chunk
/// with `is_final` may still carry trailing text. An `error` ends the turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    pub seq: u64,
    pub delta: String,
    pub is_final: bool,
    pub error: Option<TransportError>,
}

impl StreamChunk {
    pub fn delta(seq: u64, text: impl Into<String>) -> Self {
        Self {
            seq,
            delta: text.into(),
            is_final: false,
            error: None,
        }
    }

    pub fn finished(seq: u64) -> Self {
        Self {
            seq,
            delta: String::new(),
            is_final: true,
            error: None,
        }
    }

    pub fn failed(seq: u64, error: TransportError) -> Self {
        Self {
            seq,
            delta: String::new(),
            is_final: false,
            error: Some(error),
        }
    }
}

pub type ChunkStream = BoxStream<'static, StreamChunk>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOptions {
    pub model: Option<String>,
}

/// Everything the backend needs to produce one assistant reply.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub session_id: SessionId,
    pub user_message_id: MessageId,
    pub user_content: String,
    /// Finalized history up to and including the user message.
    pub history: Vec<Message>,
    pub options: TurnOptions,
}

#[async_trait]
pub trait TurnBackend: Send + Sync {
    /// Open a response stream. Failing to connect is reported here; failures
    /// after the first chunk arrive in-band as [`StreamChunk::error`].
    async fn start_turn(&self, request: TurnRequest) -> Result<ChunkStream, TransportError>;
}

/// Raw usage figures from the context endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextReport {
    pub current_tokens: u64,
    pub limit: u64,
    pub percentage: f64,
    pub recommendation: Option<String>,
}

#[async_trait]
pub trait ContextSource: Send + Sync {
    async fn context_status(&self, session_id: &SessionId) -> Result<ContextReport, TransportError>;
}

/// A file the user picked but that has not been uploaded yet.
#[derive(Debug, Clone)]
pub struct PendingAttachment {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Size and count limits are the uploader's business, not the session's.
#[async_trait]
pub trait AttachmentUploader: Send + Sync {
    async fn upload_attachment(&self, file: PendingAttachment)
        -> Result<Attachment, PersistenceError>;
}
