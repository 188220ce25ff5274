//! Suppression table operations.

use crate::codec::{parse_opt_time, parse_time};
use crate::error::{DatabaseError, Result};
use sqlx::{Pool, Row, Sqlite};
use vigil_core::{Fingerprint, IssueStatus};
use vigil_issues::Suppression;

/// Record a suppression and mark the matching issue suppressed, atomically.
///
/// An existing suppression for the same fingerprint is replaced.
///
/// # Errors
/// Returns `DatabaseError` if either statement fails.
pub async fn add_suppression(pool: &Pool<Sqlite>, suppression: &Suppression) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO suppressions (fingerprint, reason, created_at, expires_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(fingerprint) DO UPDATE SET
             reason = excluded.reason,
             created_at = excluded.created_at,
             expires_at = excluded.expires_at",
    )
    .bind(suppression.fingerprint.as_str())
    .bind(&suppression.reason)
    .bind(suppression.created_at.to_rfc3339())
    .bind(suppression.expires_at.map(|t| t.to_rfc3339()))
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE issues SET status = ? WHERE fingerprint = ?")
        .bind(IssueStatus::Suppressed.as_str())
        .bind(suppression.fingerprint.as_str())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::debug!("Suppressed issue {}", suppression.fingerprint.short());
    Ok(())
}

/// All suppressions, expired ones included.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or a row cannot be decoded.
pub async fn list_suppressions(pool: &Pool<Sqlite>) -> Result<Vec<Suppression>> {
    let rows = sqlx::query(
        "SELECT fingerprint, reason, created_at, expires_at FROM suppressions ORDER BY fingerprint",
    )
    .fetch_all(pool)
    .await?;

    let mut suppressions = Vec::with_capacity(rows.len());
    for row in rows {
        let fingerprint: String = row.try_get("fingerprint")?;
        let created_at: String = row.try_get("created_at")?;
        suppressions.push(Suppression {
            fingerprint: Fingerprint::from_hex(fingerprint)
                .map_err(|e| DatabaseError::Decode(format!("fingerprint: {e}")))?,
            reason: row.try_get("reason")?,
            created_at: parse_time("created_at", &created_at)?,
            expires_at: parse_opt_time("expires_at", row.try_get("expires_at")?)?,
        });
    }
    Ok(suppressions)
}

/// Delete a suppression. Returns whether one existed.
///
/// The issue's status is left alone; the next run that observes it reopens
/// it.
///
/// # Errors
/// Returns `DatabaseError` if the statement fails.
pub async fn remove_suppression(pool: &Pool<Sqlite>, fingerprint: &Fingerprint) -> Result<bool> {
    let result = sqlx::query("DELETE FROM suppressions WHERE fingerprint = ?")
        .bind(fingerprint.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
