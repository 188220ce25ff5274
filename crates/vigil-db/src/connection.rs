//! Connection pool setup.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

/// Open a `SQLite` pool at `path` (`:memory:` for an in-memory database).
///
/// An in-memory database exists per connection, so its pool is capped at a
/// single connection.
///
/// # Errors
/// Returns `DatabaseError::Open` if the path is not valid UTF-8 or the
/// database cannot be opened.
pub async fn connect(path: impl AsRef<Path>) -> Result<Pool<Sqlite>> {
    let path_str = path.as_ref().to_str().ok_or_else(|| {
        DatabaseError::Open("invalid database path: not valid UTF-8".to_string())
    })?;
    let in_memory = path_str == ":memory:";

    let mut options = SqliteConnectOptions::from_str(path_str)
        .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
        .foreign_keys(true)
        .create_if_missing(true);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 5 })
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::Open(format!("failed to open pool: {e}")))?;

    tracing::info!("Database pool created at {}", path_str);
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_pool() {
        let pool = connect(":memory:").await.expect("open pool");
        let one: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&pool)
            .await
            .expect("query");
        assert_eq!(one, 1);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_file_pool_is_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vigil.db");
        let pool = connect(&path).await.expect("open pool");
        pool.close().await;
        assert!(path.exists());
    }
}
