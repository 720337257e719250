//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_parse_error() {
    let result = load_from_path(Path::new("/tmp/nonexistent_colloquy_config.toml"));
    let err = result.unwrap_err();
    assert!(matches!(err, colloquy_common::ConfigError::ParseError(_)));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[context]
warn_percent = 60.0
poll_interval_secs = 0

[activity]
coding_models = ["deepseek-coder"]
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.context.warn_percent, 60.0);
    assert_eq!(config.context.poll_interval_secs, 0);
    assert_eq!(config.activity.coding_models, vec!["deepseek-coder"]);
    // Defaults preserved
    assert_eq!(config.context.critical_percent, 90.0);
    assert_eq!(config.scroll.pin_threshold, 100.0);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, colloquy_common::ConfigError::ParseError(_)));
}

#[test]
fn load_with_invalid_values_returns_parsed_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[context]\nwarn_percent = 95.0\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.context.warn_percent, 95.0);
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("colloquy").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.context.critical_percent, 90.0);
}

#[test]
fn default_config_toml_is_valid() {
    use super::template::default_config_toml;
    use crate::schema::ColloquyConfig;

    let config: ColloquyConfig = toml::from_str(&default_config_toml()).unwrap();
    assert!(crate::validation::validate(&config).is_ok());
}

#[test]
fn default_config_path_is_reasonable() {
    if let Ok(path) = default_config_path() {
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("colloquy"));
        assert!(path_str.ends_with("config.toml"));
    }
}

#[test]
fn config_path_in_nests_under_app_dir() {
    let path = config_path_in(Path::new("/base"));
    assert_eq!(path, Path::new("/base/colloquy/config.toml"));
}

#[test]
fn load_or_create_writes_template_on_first_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = config_path_in(dir.path());
    assert!(!path.exists());

    let config = load_or_create(&path).unwrap();
    assert!(path.exists());
    assert_eq!(config.scroll.pin_threshold, 100.0);

    std::fs::write(&path, "[scroll]\npin_threshold = 40.0\n").unwrap();
    let config = load_or_create(&path).unwrap();
    assert_eq!(config.scroll.pin_threshold, 40.0);
}
