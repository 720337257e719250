//! Tests for the full validation pipeline.

use super::*;
use crate::schema::ColloquyConfig;

#[test]
fn default_config_validates() {
    let config = ColloquyConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_pending_chunks_zero() {
    let mut config = ColloquyConfig::default();
    config.stream.max_pending_chunks = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("stream.max_pending_chunks"));
}

#[test]
fn catches_event_capacity_too_small() {
    let mut config = ColloquyConfig::default();
    config.stream.event_capacity = 4;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("stream.event_capacity"));
}

#[test]
fn catches_warn_above_critical() {
    let mut config = ColloquyConfig::default();
    config.context.warn_percent = 95.0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("must be below context.critical_percent"));
}

#[test]
fn catches_critical_out_of_range() {
    let mut config = ColloquyConfig::default();
    config.context.critical_percent = 150.0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("context.critical_percent"));
}

#[test]
fn catches_non_positive_pin_threshold() {
    let mut config = ColloquyConfig::default();
    config.scroll.pin_threshold = -1.0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("scroll.pin_threshold"));
}

#[test]
fn catches_empty_research_keyword() {
    let mut config = ColloquyConfig::default();
    config.activity.research_keywords.push("  ".into());
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("activity.research_keywords"));
}

#[test]
fn collects_multiple_errors() {
    let mut config = ColloquyConfig::default();
    config.stream.max_pending_chunks = 0;
    config.activity.progress_scale_chars = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("stream.max_pending_chunks"));
    assert!(err.contains("activity.progress_scale_chars"));
    assert!(err.contains("; "));
}
