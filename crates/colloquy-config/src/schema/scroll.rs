//! Scroll pinning configuration types.

use serde::{Deserialize, Serialize};

/// Scroll/attention arbiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Distance from the newest content below which the viewport is pinned.
    pub pin_threshold: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            pin_threshold: 100.0,
        }
    }
}
