//! Colloquy configuration system.
//!
//! Provides TOML-based configuration for the session controller: stream
//! buffering, activity heuristics, context thresholds, scroll pinning,
//! storage and logging. All sections use sensible defaults so partial
//! configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use colloquy_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    ActivityConfig, ColloquyConfig, ContextConfig, LoggingConfig, ScrollConfig, StorageConfig,
    StreamConfig, CONFIG_SCHEMA_VERSION,
};

use colloquy_common::ConfigError;
use std::path::Path;

/// Load config from the platform default path, creating it if missing,
/// and reject it if validation fails.
pub fn load_config() -> Result<ColloquyConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load and validate config from an explicit path.
pub fn load_config_from(path: &Path) -> Result<ColloquyConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let config = toml_loader::load_from_path(path)?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &ColloquyConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
