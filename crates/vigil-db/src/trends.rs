//! Trend table operations. Rows are never updated.

use crate::codec::{parse_date, parse_enum, to_u32};
use crate::error::{DatabaseError, Result};
use sqlx::{Pool, Row, Sqlite};
use vigil_core::{DomainId, SeverityCounts};
use vigil_issues::TrendRow;

/// Insert trend rows, keeping any existing `(domain, category, date)` row.
/// Returns how many rows were inserted.
///
/// # Errors
/// Returns `DatabaseError` if a statement fails; earlier rows of the batch
/// are rolled back.
pub async fn record_trends(pool: &Pool<Sqlite>, rows: &[TrendRow]) -> Result<usize> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;

    for row in rows {
        let result = sqlx::query(
            "INSERT INTO trends (domain, category, date, open_issues, blocker, high, medium, low, score)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(domain, category, date) DO NOTHING",
        )
        .bind(row.domain.as_str())
        .bind(row.category.as_str())
        .bind(row.date.format("%Y-%m-%d").to_string())
        .bind(i64::from(row.open_issues))
        .bind(i64::from(row.counts.blocker))
        .bind(i64::from(row.counts.high))
        .bind(i64::from(row.counts.medium))
        .bind(i64::from(row.counts.low))
        .bind(i64::from(row.score))
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(usize::try_from(inserted).unwrap_or(usize::MAX))
}

/// Trend rows of one domain, ordered by date then category.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or a row cannot be decoded.
pub async fn list_trends(pool: &Pool<Sqlite>, domain: &DomainId) -> Result<Vec<TrendRow>> {
    let rows = sqlx::query(
        "SELECT domain, category, date, open_issues, blocker, high, medium, low, score
         FROM trends WHERE domain = ? ORDER BY date, category",
    )
    .bind(domain.as_str())
    .fetch_all(pool)
    .await?;

    let mut trends = Vec::with_capacity(rows.len());
    for row in rows {
        let domain: String = row.try_get("domain")?;
        let category: String = row.try_get("category")?;
        let date: String = row.try_get("date")?;
        trends.push(TrendRow {
            domain: DomainId::new(domain)
                .map_err(|e| DatabaseError::Decode(format!("domain: {e}")))?,
            category: parse_enum("category", &category)?,
            date: parse_date("date", &date)?,
            open_issues: to_u32("open_issues", row.try_get("open_issues")?)?,
            counts: SeverityCounts::new(
                to_u32("blocker", row.try_get("blocker")?)?,
                to_u32("high", row.try_get("high")?)?,
                to_u32("medium", row.try_get("medium")?)?,
                to_u32("low", row.try_get("low")?)?,
            ),
            score: to_u32("score", row.try_get("score")?)?,
        });
    }
    Ok(trends)
}
