//! Activity derivation configuration types.

use serde::{Deserialize, Serialize};

/// Heuristics used when deriving activities from the message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Words in the prompt that mark a live turn as a research phase.
    /// Anything else is treated as a coding phase.
    pub research_keywords: Vec<String>,
    /// Case-insensitive substrings of model names that are coding-capable.
    pub coding_models: Vec<String>,
    /// Buffered characters at which a live activity reports roughly 50%.
    pub progress_scale_chars: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            research_keywords: [
                "research",
                "investigate",
                "analyze",
                "analyse",
                "compare",
                "survey",
                "explore",
                "overview",
                "summarize",
                "size",
                "scope",
                "how big",
                "how large",
                "how many",
                "estimate",
                "market",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            coding_models: ["code", "claude", "gpt-4", "gpt-5", "o3", "o4", "sonnet", "opus"]
                .into_iter()
                .map(String::from)
                .collect(),
            progress_scale_chars: 2000,
        }
    }
}
