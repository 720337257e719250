//! Reading `ColloquyConfig` from TOML.

use crate::schema::ColloquyConfig;
use crate::validation;
use colloquy_common::ConfigError;
use std::path::Path;
use tracing::{debug, warn};

use super::paths::{create_default_config, default_config_path};

/// Parse the file at `path`. Missing sections and keys take their defaults.
///
/// Out-of-range values are only warned about here; `load_config` is the
/// entry point that rejects them.
pub fn load_from_path(path: &Path) -> Result<ColloquyConfig, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("cannot read {}: {e}", path.display())))?;
    let config: ColloquyConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), "{e}");
    }
    debug!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Load `path`, or write the template there and return the defaults when
/// nothing exists yet.
pub fn load_or_create(path: &Path) -> Result<ColloquyConfig, ConfigError> {
    if path.exists() {
        return load_from_path(path);
    }
    create_default_config(path)?;
    Ok(ColloquyConfig::default())
}

/// [`load_or_create`] at [`default_config_path`].
pub fn load_default() -> Result<ColloquyConfig, ConfigError> {
    load_or_create(&default_config_path()?)
}
