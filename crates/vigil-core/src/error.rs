//! Core error types for the vigil audit engine.
//!
//! `CoreError` covers value validation and configuration; the other crates
//! define their own error enums.

use thiserror::Error;

/// Errors raised by the core types and configuration.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (invalid input, constraints)
    #[error("validation error: {0}")]
    Validation(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Config file not found
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::Validation("bad hostname".to_string());
        assert_eq!(err.to_string(), "validation error: bad hostname");

        let err = ConfigError::InvalidValue {
            field: "domains[0].page_budget".to_string(),
            reason: "must be greater than zero".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for domains[0].page_budget: must be greater than zero"
        );
    }

    #[test]
    fn test_error_from_config() {
        let config_err = ConfigError::NoConfigDir;
        let core_err: CoreError = config_err.into();
        assert!(matches!(core_err, CoreError::Config(_)));
    }
}
