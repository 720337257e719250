use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Top-level error for binaries wiring the crates together.
#[derive(Debug, thiserror::Error)]
pub enum ColloquyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("session error: {0}")]
    Session(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("scroll.pin_threshold = 0".into());
        assert_eq!(
            err.to_string(),
            "config validation error: scroll.pin_threshold = 0"
        );
    }

    #[test]
    fn colloquy_error_from_config() {
        let err: ColloquyError = ConfigError::ParseError("bad toml".into()).into();
        assert!(matches!(err, ColloquyError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn colloquy_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: ColloquyError = io_err.into();
        assert!(matches!(err, ColloquyError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn colloquy_error_session_display() {
        let err = ColloquyError::Session("closed".into());
        assert_eq!(err.to_string(), "session error: closed");
    }
}
