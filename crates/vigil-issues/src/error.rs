//! Issue store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("issue not found: {0}")]
    IssueNotFound(String),

    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
