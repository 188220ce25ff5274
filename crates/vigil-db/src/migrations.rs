//! Database migration management.
//!
//! Embeds SQL migrations and provides functions to apply them automatically.
//! Uses `SQLx`'s built-in migration support with compile-time embedding.

use crate::error::{DatabaseError, Result};
use sqlx::{Pool, Sqlite};

/// Run all pending database migrations.
///
/// Applied migrations are tracked in the `_sqlx_migrations` table, so this
/// is safe to call on every start.
///
/// # Errors
/// Returns `DatabaseError::Migration` if any migration fails to execute.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    tracing::info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration execution failed: {e}")))?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

/// Get the current schema version.
///
/// Returns the version of the latest applied migration, or 0 when none
/// have been applied yet.
///
/// # Errors
/// Returns `DatabaseError` if the migrations table cannot be queried.
pub async fn get_schema_version(pool: &Pool<Sqlite>) -> Result<i64> {
    let table_exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?
        > 0;

    if !table_exists {
        return Ok(0);
    }

    let version =
        sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(version), 0) FROM _sqlx_migrations")
            .fetch_optional(pool)
            .await?
            .unwrap_or(0);

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect;

    const LATEST: i64 = 20_250_101_000_003;

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = connect(":memory:").await.expect("open pool");
        run_migrations(&pool).await.expect("run migrations");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name"
        )
        .fetch_all(&pool)
        .await
        .expect("query tables");

        assert_eq!(
            tables,
            vec!["domain_runs", "issues", "runs", "suppressions", "trends"]
        );
    }

    #[tokio::test]
    async fn test_get_schema_version() {
        let pool = connect(":memory:").await.expect("open pool");
        assert_eq!(get_schema_version(&pool).await.expect("version"), 0);

        run_migrations(&pool).await.expect("run migrations");
        assert_eq!(get_schema_version(&pool).await.expect("version"), LATEST);
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let pool = connect(":memory:").await.expect("open pool");
        run_migrations(&pool).await.expect("first migration run");
        run_migrations(&pool)
            .await
            .expect("second migration run should be idempotent");
        assert_eq!(get_schema_version(&pool).await.expect("version"), LATEST);
    }
}
