//! Replaceable heuristics behind activity derivation.

use std::fmt;

use regex::Regex;
use tracing::warn;

use colloquy_config::ActivityConfig;

/// What a streaming turn is presumed to be doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivePhase {
    Research,
    Coding,
}

/// Classifies the prompt behind a live turn. Must be deterministic.
pub trait PhaseClassifier: Send + Sync + fmt::Debug {
    fn classify(&self, prompt: &str) -> LivePhase;
}

/// Research when the prompt mentions any keyword as a whole word,
/// coding otherwise. Approximate by nature.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    pattern: Option<Regex>,
}

impl KeywordClassifier {
    pub fn new(keywords: &[String]) -> Self {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return Self { pattern: None };
        }

        let source = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
        let pattern = match Regex::new(&source) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("research keyword pattern rejected, live turns default to coding: {e}");
                None
            }
        };
        Self { pattern }
    }
}

impl PhaseClassifier for KeywordClassifier {
    fn classify(&self, prompt: &str) -> LivePhase {
        match self.pattern {
            Some(ref re) if re.is_match(prompt) => LivePhase::Research,
            _ => LivePhase::Coding,
        }
    }
}

#[derive(Debug)]
pub struct ActivityPolicy {
    classifier: Box<dyn PhaseClassifier>,
    coding_models: Vec<String>,
    progress_scale: usize,
}

impl ActivityPolicy {
    pub fn from_config(config: &ActivityConfig) -> Self {
        Self {
            classifier: Box::new(KeywordClassifier::new(&config.research_keywords)),
            coding_models: config
                .coding_models
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            progress_scale: config.progress_scale_chars.max(1),
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn PhaseClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn classify(&self, prompt: &str) -> LivePhase {
        self.classifier.classify(prompt)
    }

    pub fn is_coding_model(&self, model: &str) -> bool {
        let model = model.to_lowercase();
        self.coding_models.iter().any(|m| model.contains(m.as_str()))
    }

    /// Monotonic in `buffered_chars`, about half way at the configured scale and
    /// approaching but never reaching 99.
    pub fn live_progress(&self, buffered_chars: usize) -> u8 {
        let len = buffered_chars as u128;
        let pct = 99 * len / (len + self.progress_scale as u128);
        pct.min(99) as u8
    }
}

impl Default for ActivityPolicy {
    fn default() -> Self {
        Self::from_config(&ActivityConfig::default())
    }
}
