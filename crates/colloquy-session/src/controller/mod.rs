//! One controller per session: owns the message store and the active turn,
//! and serves derived state to the presentation layer.
//!
//! The controller is synchronous. Whoever owns it must feed it events one at
//! a time; [`crate::runtime::SessionHandle`] does that from a single task.

mod events;
mod mutations;


use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use colloquy_common::{MessageId, SessionId};
use colloquy_config::ColloquyConfig;

use crate::activity::{self, Activity, ActivityPolicy};
use crate::backend::TurnRequest;
use crate::context::{ContextMonitor, ContextStatus, ContextThresholds};
use crate::error::{ErrorContext, Operation};
use crate::ingest::{StreamIngest, Turn, TurnHandle};
use crate::message::Message;
use crate::scroll::{ScrollArbiter, ScrollEffect, ScrollState};
use crate::store::MessageStore;

pub use events::SessionEvent;

/// Where a branched session came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkOrigin {
    pub session_id: SessionId,
    pub message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    /// Token budget assumed until the backend reports one.
    pub context_budget: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forked_from: Option<ForkOrigin>,
}

impl Session {
    pub fn new(context_budget: u64) -> Self {
        Self {
            id: SessionId::new(),
            created_at: Utc::now(),
            context_budget,
            forked_from: None,
        }
    }
}

/// Tunables copied into every controller, including branches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    pub max_pending_chunks: usize,
    pub thresholds: ContextThresholds,
    pub pin_threshold: f64,
    pub context_budget: u64,
}

impl ControllerSettings {
    pub fn from_config(config: &ColloquyConfig) -> Self {
        Self {
            max_pending_chunks: config.stream.max_pending_chunks,
            thresholds: ContextThresholds::from(&config.context),
            pin_threshold: config.scroll.pin_threshold,
            context_budget: config.context.default_budget_tokens,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&ColloquyConfig::default())
    }
}

/// A turn that has been registered and now needs a transport.
#[derive(Debug)]
pub struct TurnStart {
    pub handle: TurnHandle,
    pub request: TurnRequest,
}

pub struct SessionController {
    session: Session,
    settings: ControllerSettings,
    store: MessageStore,
    ingest: StreamIngest,
    context: ContextMonitor,
    scroll: ScrollArbiter,
    policy: Arc<ActivityPolicy>,
    /// Derived activities, cleared by anything that can change them.
    activities: OnceLock<Vec<Activity>>,
    /// User message edited since its reply was produced.
    edited: Option<MessageId>,
    model: Option<String>,
    events: Vec<SessionEvent>,
}

impl SessionController {
    pub fn new(settings: ControllerSettings, policy: Arc<ActivityPolicy>) -> Self {
        Self::from_parts(Session::new(settings.context_budget), Vec::new(), settings, policy)
    }

    pub fn from_config(config: &ColloquyConfig) -> Self {
        Self::new(
            ControllerSettings::from_config(config),
            Arc::new(ActivityPolicy::from_config(&config.activity)),
        )
    }

    pub fn from_parts(
        session: Session,
        messages: Vec<Message>,
        settings: ControllerSettings,
        policy: Arc<ActivityPolicy>,
    ) -> Self {
        Self {
            session,
            settings,
            store: MessageStore::from_messages(messages),
            ingest: StreamIngest::new(settings.max_pending_chunks),
            context: ContextMonitor::new(settings.thresholds),
            scroll: ScrollArbiter::new(settings.pin_threshold),
            policy,
            activities: OnceLock::new(),
            edited: None,
            model: None,
            events: Vec::new(),
        }
    }

    /// Model requested for every turn this session starts.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn id(&self) -> &SessionId {
        &self.session.id
    }

    pub fn settings(&self) -> ControllerSettings {
        self.settings
    }

    pub fn messages(&self) -> &[Message] {
        self.store.get()
    }

    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    /// Retrospective activities followed by the live one, if a turn streams.
    pub fn activities(&self) -> &[Activity] {
        self.activities
            .get_or_init(|| activity::derive(self.store.get(), self.ingest.active(), &self.policy))
    }

    pub fn context_status(&self) -> Option<&ContextStatus> {
        self.context.status()
    }

    pub fn scroll_state(&self) -> ScrollState {
        self.scroll.state()
    }

    pub fn active_turn(&self) -> Option<&Turn> {
        self.ingest.active()
    }

    pub fn is_streaming(&self) -> bool {
        self.ingest.is_streaming()
    }

    /// The user message edited since its reply was produced, if any. A
    /// regenerate of that reply will use the edited text.
    pub fn edited_message(&self) -> Option<&MessageId> {
        self.edited.as_ref()
    }

    /// Take every event produced since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    fn error_context(&self, operation: Operation) -> ErrorContext {
        ErrorContext::new(self.session.id.clone(), operation)
    }

    fn invalidate(&mut self) {
        self.activities.take();
    }

    fn emit(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    fn follow_content(&mut self, streaming: bool, store_grew: bool) {
        if let Some(ScrollEffect::ScrollToLatest) = self.scroll.on_content(streaming, store_grew) {
            self.emit(SessionEvent::ScrollToLatest);
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &self.session.id)
            .field("messages", &self.store.len())
            .field("revision", &self.store.revision())
            .field("streaming", &self.ingest.is_streaming())
            .finish()
    }
}
