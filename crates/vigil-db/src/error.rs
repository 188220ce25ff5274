//! Database error types.

use thiserror::Error;
use vigil_issues::StoreError;

/// Database-specific errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to open or create database connection.
    #[error("failed to open database: {0}")]
    Open(String),

    /// Migration execution failed.
    #[error("migration failed: {0}")]
    Migration(String),

    /// Database record with provided identifier not found.
    #[error("{0}")]
    NotFound(String),

    /// Failed to decode database value.
    #[error("decode error: {0}")]
    Decode(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying `SQLx` error.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Result type alias for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Serialization(e) => StoreError::Serialization(e),
            other => StoreError::Backend(other.to_string()),
        }
    }
}
