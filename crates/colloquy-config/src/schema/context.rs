//! Context budget monitoring configuration types.

use serde::{Deserialize, Serialize};

/// Thresholds and polling for the context monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Usage at or above this percentage raises a warning (valid range: 1-100).
    pub warn_percent: f64,
    /// Usage above this percentage is critical (valid range: 1-100, > warn_percent).
    pub critical_percent: f64,
    /// Idle polling interval in seconds; 0 disables periodic refresh.
    pub poll_interval_secs: u64,
    /// Token budget assumed for new sessions when the backend reports none.
    pub default_budget_tokens: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            warn_percent: 75.0,
            critical_percent: 90.0,
            poll_interval_secs: 30,
            default_budget_tokens: 200_000,
        }
    }
}
