//! Configuration schema types for Colloquy.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod activity;
mod context;
mod scroll;
mod stream;
mod system;

pub use activity::*;
pub use context::*;
pub use scroll::*;
pub use stream::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Colloquy.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ColloquyConfig {
    pub stream: StreamConfig,
    pub activity: ActivityConfig,
    pub context: ContextConfig,
    pub scroll: ScrollConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: ColloquyConfig = toml::from_str("").unwrap();
        assert_eq!(config.context.warn_percent, 75.0);
        assert_eq!(config.context.critical_percent, 90.0);
        assert_eq!(config.scroll.pin_threshold, 100.0);
        assert_eq!(config.stream.max_pending_chunks, 256);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: ColloquyConfig = toml::from_str(
            r#"
[context]
critical_percent = 95.0
"#,
        )
        .unwrap();
        assert_eq!(config.context.critical_percent, 95.0);
        assert_eq!(config.context.warn_percent, 75.0);
        assert!(!config.activity.research_keywords.is_empty());
    }

    #[test]
    fn log_level_parses_lowercase() {
        let config: ColloquyConfig = toml::from_str("[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.level.as_directive(), "debug");
    }
}
