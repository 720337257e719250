//! Session runtime: one task owns each [`SessionController`] and every
//! interaction with it goes through a cloneable [`SessionHandle`].
//!
//! User operations, stream chunks, context results and poll ticks are all
//! commands on one queue, so they are applied one at a time in arrival
//! order. Backend streams and context queries run in their own tasks and
//! report back through that queue.
//!
//! [`SessionController`]: crate::controller::SessionController

mod actor;
mod command;
mod handle;

#[cfg(test)]
pub(crate) mod testing;


use std::sync::Arc;
use std::time::Duration;

use colloquy_config::ColloquyConfig;

use crate::backend::{AttachmentUploader, ContextSource, TurnBackend};
use crate::persistence::MessageRepository;

pub use command::ScrollAction;
pub use handle::{SessionHandle, SessionSnapshot};

const COMMAND_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeSettings {
    /// Capacity of each session's event broadcast channel.
    pub event_capacity: usize,
    /// Idle context polling period. `None` disables polling.
    pub poll_interval: Option<Duration>,
}

impl RuntimeSettings {
    pub fn from_config(config: &ColloquyConfig) -> Self {
        let secs = config.context.poll_interval_secs;
        Self {
            event_capacity: config.stream.event_capacity,
            poll_interval: (secs > 0).then(|| Duration::from_secs(secs)),
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from_config(&ColloquyConfig::default())
    }
}

/// The collaborators a session talks to. Shared by a session and every
/// session branched from it.
#[derive(Clone)]
pub struct SessionServices {
    pub backend: Arc<dyn TurnBackend>,
    pub context: Arc<dyn ContextSource>,
    pub repository: Arc<dyn MessageRepository>,
    pub uploader: Option<Arc<dyn AttachmentUploader>>,
    pub settings: RuntimeSettings,
}

impl SessionServices {
    pub fn new(
        backend: Arc<dyn TurnBackend>,
        context: Arc<dyn ContextSource>,
        repository: Arc<dyn MessageRepository>,
    ) -> Self {
        Self {
            backend,
            context,
            repository,
            uploader: None,
            settings: RuntimeSettings::default(),
        }
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn AttachmentUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn with_settings(mut self, settings: RuntimeSettings) -> Self {
        self.settings = settings;
        self
    }
}
