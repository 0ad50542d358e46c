//! Custom error types for the crate.
//!
//! This module defines the primary error type, `LoggerError`, used across the
//! library. Configuration mistakes (an unknown trigger type, an unusable
//! timer interval) get dedicated variants so callers can reject a change
//! while leaving the running session untouched; I/O and serialization errors
//! arrive through `#[from]` conversions and compose with the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type Result<T> = std::result::Result<T, LoggerError>;

/// Errors produced by the data logger and its collaborators.
#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Unknown trigger type '{0}'")]
    UnknownTriggerType(String),

    #[error("Invalid trigger interval: {0}")]
    InvalidInterval(String),

    #[error("No variables configured for collection")]
    NoVariables,

    #[error("Variable trigger configured without a trigger variable")]
    NoTriggerVariable,

    #[error("Variable '{0}' is not tracked")]
    UnknownVariable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Data file has an unexpected layout: {0}")]
    MalformedFile(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_offending_value() {
        let err = LoggerError::UnknownTriggerType("sometimes".into());
        assert!(err.to_string().contains("sometimes"));

        let err = LoggerError::InvalidInterval("-1".into());
        assert!(err.to_string().contains("-1"));
    }
}
