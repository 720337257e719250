//! Conversation session controller for Colloquy.
//!
//! Owns the message log of a chat session and everything derived from it:
//! - Streaming ingest of one in-flight turn at a time, resequenced and cancellable
//! - Mutation operations: send, stop, edit, regenerate, branch, delete
//! - Activity records derived from finalized messages and the live turn
//! - Context-window monitoring with fail-open refresh
//! - Scroll pinning that never fights a manual scroll
//!
//! [`SessionController`] is the synchronous core. [`SessionHandle`] runs a
//! controller on its own task and serializes every event through one queue.

pub mod activity;
pub mod backend;
pub mod context;
pub mod controller;
pub mod error;
pub mod ingest;
pub mod message;
pub mod persistence;
pub mod runtime;
pub mod scroll;
pub mod store;

pub use activity::{derive, Activity, ActivityKind, ActivityPolicy, ActivityStatus};
pub use backend::{
    AttachmentUploader, ChunkStream, ContextReport, ContextSource, PendingAttachment, StreamChunk,
    TurnBackend, TurnOptions, TurnRequest,
};
pub use context::{ContextMonitor, ContextStatus, Recommendation, WarningLevel};
pub use controller::{Session, SessionController, SessionEvent, TurnStart};
pub use error::{ErrorContext, Operation, PersistenceError, SessionError, TransportError};
pub use ingest::{StreamIngest, TurnHandle, TurnId, TurnStatus};
pub use message::{Attachment, Message, Role};
pub use persistence::{InMemoryRepository, JsonDirRepository, MessageRepository};
pub use runtime::{RuntimeSettings, ScrollAction, SessionHandle, SessionServices, SessionSnapshot};
pub use scroll::{ScrollArbiter, ScrollState};
pub use store::MessageStore;
