pub mod errors;
pub mod id;

pub use errors::{ColloquyError, ConfigError};
pub use id::{new_correlation_id, new_id, MessageId, SessionId};

pub type Result<T> = std::result::Result<T, ColloquyError>;
