//! Check module error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("failed to parse page: {0}")]
    Parse(String),

    #[error("module {module} panicked: {message}")]
    Panicked { module: String, message: String },

    #[error("module already registered: {0}")]
    DuplicateModule(String),

    #[error("internal check error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CheckError>;
