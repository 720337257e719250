//! Scripted collaborators for driving a session deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{stream, StreamExt};

use colloquy_common::SessionId;

use crate::backend::{
    AttachmentUploader, ChunkStream, ContextReport, ContextSource, PendingAttachment, StreamChunk,
    TurnBackend, TurnRequest,
};
use crate::error::{PersistenceError, TransportError};
use crate::message::Attachment;
use crate::persistence::InMemoryRepository;

use super::{RuntimeSettings, SessionServices};

/// How the backend answers one turn.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    /// Yield these chunks, then end.
    Chunks(Vec<StreamChunk>),
    /// Yield these chunks, then never finish.
    Hang(Vec<StreamChunk>),
    /// Refuse to open the stream.
    Refuse(TransportError),
}

impl Script {
    /// Stream `words` as deltas followed by a final chunk.
    pub(crate) fn reply(words: &[&str]) -> Self {
        let mut chunks: Vec<StreamChunk> = words
            .iter()
            .enumerate()
            .map(|(seq, w)| StreamChunk::delta(seq as u64, *w))
            .collect();
        chunks.push(StreamChunk::finished(words.len() as u64));
        Script::Chunks(chunks)
    }
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<TurnRequest>>,
}

impl ScriptedBackend {
    pub(crate) fn new(scripts: impl IntoIterator<Item = Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<TurnRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TurnBackend for ScriptedBackend {
    async fn start_turn(&self, request: TurnRequest) -> Result<ChunkStream, TransportError> {
        self.requests.lock().unwrap().push(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::reply(&["ok"]));
        match script {
            Script::Chunks(chunks) => Ok(stream::iter(chunks).boxed()),
            Script::Hang(chunks) => Ok(stream::iter(chunks)
                .chain(stream::pending::<StreamChunk>())
                .boxed()),
            Script::Refuse(error) => Err(error),
        }
    }
}

/// Reports a fixed usage percentage, or fails every query.
#[derive(Debug)]
pub(crate) struct FixedContext {
    percentage: Option<f64>,
    queries: AtomicUsize,
}

impl FixedContext {
    pub(crate) fn at(percentage: f64) -> Arc<Self> {
        Arc::new(Self {
            percentage: Some(percentage),
            queries: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            percentage: None,
            queries: AtomicUsize::new(0),
        })
    }

    pub(crate) fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextSource for FixedContext {
    async fn context_status(&self, _session_id: &SessionId) -> Result<ContextReport, TransportError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match self.percentage {
            Some(percentage) => Ok(ContextReport {
                current_tokens: (percentage * 1000.0) as u64,
                limit: 100_000,
                percentage,
                recommendation: None,
            }),
            None => Err(TransportError::Network("context endpoint down".into())),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingUploader;

#[async_trait]
impl AttachmentUploader for RecordingUploader {
    async fn upload_attachment(
        &self,
        file: PendingAttachment,
    ) -> Result<Attachment, PersistenceError> {
        if file.bytes.is_empty() {
            return Err(PersistenceError::Upload(format!("{} is empty", file.name)));
        }
        Ok(Attachment {
            id: format!("att-{}", file.name),
            name: file.name.clone(),
            mime_type: file.mime_type,
            size_bytes: file.bytes.len() as u64,
            reference: format!("mem://{}", file.name),
        })
    }
}

pub(crate) fn services(
    backend: Arc<ScriptedBackend>,
    context: Arc<FixedContext>,
    repository: Arc<InMemoryRepository>,
) -> SessionServices {
    SessionServices::new(backend, context, repository).with_settings(RuntimeSettings {
        event_capacity: 256,
        poll_interval: None,
    })
}
