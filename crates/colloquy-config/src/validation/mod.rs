//! Full configuration validation.
//!
//! Validates numeric ranges and cross-field ordering. Each section has its
//! own check; this orchestrator calls them all and collects errors into a
//! single `ConfigError`.

mod helpers;
mod sections;

#[cfg(test)]
mod tests;

use crate::schema::ColloquyConfig;
use colloquy_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &ColloquyConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    sections::validate_stream(&mut errors, config);
    sections::validate_activity(&mut errors, config);
    sections::validate_context(&mut errors, config);
    sections::validate_scroll(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
