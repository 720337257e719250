//! Per-section validation: stream, activity, context and scroll.

use crate::schema::ColloquyConfig;

use super::helpers::{validate_range, validate_range_f64};

pub(crate) fn validate_stream(errors: &mut Vec<String>, config: &ColloquyConfig) {
    validate_range(
        errors,
        "stream.max_pending_chunks",
        config.stream.max_pending_chunks,
        1,
        65536,
    );
    validate_range(
        errors,
        "stream.event_capacity",
        config.stream.event_capacity,
        16,
        65536,
    );
}

pub(crate) fn validate_activity(errors: &mut Vec<String>, config: &ColloquyConfig) {
    if config.activity.progress_scale_chars == 0 {
        errors.push("activity.progress_scale_chars must be greater than 0".into());
    }
    if config
        .activity
        .research_keywords
        .iter()
        .any(|k| k.trim().is_empty())
    {
        errors.push("activity.research_keywords contains an empty keyword".into());
    }
}

/// Thresholds must sit in (0, 100] and keep warn below critical.
pub(crate) fn validate_context(errors: &mut Vec<String>, config: &ColloquyConfig) {
    let ctx = &config.context;
    validate_range_f64(errors, "context.warn_percent", ctx.warn_percent, 1.0, 100.0);
    validate_range_f64(
        errors,
        "context.critical_percent",
        ctx.critical_percent,
        1.0,
        100.0,
    );
    if ctx.warn_percent >= ctx.critical_percent {
        errors.push(format!(
            "context.warn_percent ({}) must be below context.critical_percent ({})",
            ctx.warn_percent, ctx.critical_percent
        ));
    }
}

pub(crate) fn validate_scroll(errors: &mut Vec<String>, config: &ColloquyConfig) {
    let threshold = config.scroll.pin_threshold;
    if threshold.is_nan() || threshold <= 0.0 {
        errors.push(format!(
            "scroll.pin_threshold = {threshold} must be positive"
        ));
    }
}
