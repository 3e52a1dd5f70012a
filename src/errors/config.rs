use std::env::VarError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable exists but could not be read (e.g. not unicode).
    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] VarError),

    /// A value was present but did not parse into the expected type.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A value parsed but is outside of what the service can run with.
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}
