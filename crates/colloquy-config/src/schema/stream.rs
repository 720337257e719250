//! Stream ingest configuration types.

use serde::{Deserialize, Serialize};

/// Buffering limits for one in-flight turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Maximum out-of-order chunks held while waiting for a gap to fill
    /// (valid range: 1-65536). Overflow fails the turn.
    pub max_pending_chunks: usize,
    /// Capacity of the session event broadcast channel (valid range: 16-65536).
    pub event_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_pending_chunks: 256,
            event_capacity: 1024,
        }
    }
}
