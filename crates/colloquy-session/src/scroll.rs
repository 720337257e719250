//! Scroll/attention arbiter: decides when the viewport follows new output.
//!
//! Pinning is recomputed from each distance sample. An explicit scroll-up
//! unpins even mid-stream; only a sample back inside the threshold or an
//! explicit jump re-pins.

use serde::{Deserialize, Serialize};
use tracing::debug;

use colloquy_config::ScrollConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollState {
    pub pinned_to_bottom: bool,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            pinned_to_bottom: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollEffect {
    ScrollToLatest,
}

#[derive(Debug, Clone)]
pub struct ScrollArbiter {
    threshold: f64,
    state: ScrollState,
}

impl ScrollArbiter {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            state: ScrollState::default(),
        }
    }

    pub fn from_config(config: &ScrollConfig) -> Self {
        Self::new(config.pin_threshold)
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Record how far the viewport is from the newest content.
    pub fn sample(&mut self, distance_from_bottom: f64) -> ScrollState {
        let pinned = distance_from_bottom < self.threshold;
        if pinned != self.state.pinned_to_bottom {
            debug!(distance_from_bottom, pinned, "scroll pin changed");
        }
        self.state.pinned_to_bottom = pinned;
        self.state
    }

    /// The user scrolled up on purpose. Never fought, even while streaming.
    pub fn user_scrolled_up(&mut self) -> ScrollState {
        self.state.pinned_to_bottom = false;
        self.state
    }

    /// The user asked to jump to the newest content.
    pub fn jump_to_bottom(&mut self) -> ScrollEffect {
        self.state.pinned_to_bottom = true;
        ScrollEffect::ScrollToLatest
    }

    /// Content changed: a delta arrived (`streaming`) or the store grew.
    pub fn on_content(&self, streaming: bool, store_grew: bool) -> Option<ScrollEffect> {
        (self.state.pinned_to_bottom && (streaming || store_grew))
            .then_some(ScrollEffect::ScrollToLatest)
    }
}

impl Default for ScrollArbiter {
    fn default() -> Self {
        Self::from_config(&ScrollConfig::default())
    }
}
