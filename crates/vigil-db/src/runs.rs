//! Run and per-domain run outcome operations.

use crate::codec::{parse_enum, parse_opt_time, parse_time, to_i64, to_u32, to_usize};
use crate::error::{DatabaseError, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use vigil_core::{DomainId, RunId, SeverityCounts};
use vigil_issues::{DomainRunSummary, Run};

/// Record a started run.
///
/// # Errors
/// Returns `DatabaseError` if the insert fails (including a duplicate id).
pub async fn create_run(pool: &Pool<Sqlite>, run: &Run) -> Result<()> {
    sqlx::query(
        "INSERT INTO runs (id, started_at, ended_at, status, blocker, high, medium, low,
                           verdict, deadline_hit, store_errors)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(run.id.as_str())
    .bind(run.started_at.to_rfc3339())
    .bind(run.ended_at.map(|t| t.to_rfc3339()))
    .bind(run.status.as_str())
    .bind(i64::from(run.counts.blocker))
    .bind(i64::from(run.counts.high))
    .bind(i64::from(run.counts.medium))
    .bind(i64::from(run.counts.low))
    .bind(run.verdict.map(|v| v.as_str()))
    .bind(run.deadline_hit)
    .bind(i64::from(run.store_errors))
    .execute(pool)
    .await?;

    tracing::debug!("Created run {}", run.id);
    Ok(())
}

/// Persist a run's terminal state.
///
/// # Errors
/// Returns `DatabaseError::NotFound` if the run was never created.
pub async fn finish_run(pool: &Pool<Sqlite>, run: &Run) -> Result<()> {
    let result = sqlx::query(
        "UPDATE runs SET ended_at = ?, status = ?, blocker = ?, high = ?, medium = ?, low = ?,
                         verdict = ?, deadline_hit = ?, store_errors = ?
         WHERE id = ?",
    )
    .bind(run.ended_at.map(|t| t.to_rfc3339()))
    .bind(run.status.as_str())
    .bind(i64::from(run.counts.blocker))
    .bind(i64::from(run.counts.high))
    .bind(i64::from(run.counts.medium))
    .bind(i64::from(run.counts.low))
    .bind(run.verdict.map(|v| v.as_str()))
    .bind(run.deadline_hit)
    .bind(i64::from(run.store_errors))
    .bind(run.id.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("run not found: {}", run.id)));
    }
    Ok(())
}

/// Get a run by id.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or the row cannot be decoded.
pub async fn get_run(pool: &Pool<Sqlite>, run_id: &RunId) -> Result<Option<Run>> {
    let row = sqlx::query(
        "SELECT id, started_at, ended_at, status, blocker, high, medium, low, verdict,
                deadline_hit, store_errors
         FROM runs WHERE id = ?",
    )
    .bind(run_id.as_str())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let started_at: String = row.try_get("started_at")?;
    let status: String = row.try_get("status")?;
    let verdict: Option<String> = row.try_get("verdict")?;

    Ok(Some(Run {
        id: RunId::from_string(row.try_get::<String, _>("id")?),
        started_at: parse_time("started_at", &started_at)?,
        ended_at: parse_opt_time("ended_at", row.try_get("ended_at")?)?,
        status: parse_enum("status", &status)?,
        counts: counts_from_row(&row)?,
        verdict: verdict.map(|v| parse_enum("verdict", &v)).transpose()?,
        deadline_hit: row.try_get("deadline_hit")?,
        store_errors: to_u32("store_errors", row.try_get("store_errors")?)?,
    }))
}

/// Record one domain's outcome within a run.
///
/// # Errors
/// Returns `DatabaseError` if the insert fails, including when the run
/// does not exist.
pub async fn record_domain_run(
    pool: &Pool<Sqlite>,
    run_id: &RunId,
    summary: &DomainRunSummary,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO domain_runs (run_id, domain, status, stop_reason, pages_fetched, findings,
                                  blocker, high, medium, low, error)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(run_id.as_str())
    .bind(summary.domain.as_str())
    .bind(summary.status.as_str())
    .bind(summary.stop_reason.map(|r| r.as_str()))
    .bind(to_i64(summary.pages_fetched))
    .bind(to_i64(summary.findings))
    .bind(i64::from(summary.counts.blocker))
    .bind(i64::from(summary.counts.high))
    .bind(i64::from(summary.counts.medium))
    .bind(i64::from(summary.counts.low))
    .bind(summary.error.as_deref())
    .execute(pool)
    .await?;

    Ok(())
}

/// Domain outcomes of a run, in recording order.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or a row cannot be decoded.
pub async fn list_domain_runs(
    pool: &Pool<Sqlite>,
    run_id: &RunId,
) -> Result<Vec<DomainRunSummary>> {
    let rows = sqlx::query(
        "SELECT domain, status, stop_reason, pages_fetched, findings, blocker, high, medium, low, error
         FROM domain_runs WHERE run_id = ? ORDER BY id",
    )
    .bind(run_id.as_str())
    .fetch_all(pool)
    .await?;

    let mut summaries = Vec::with_capacity(rows.len());
    for row in rows {
        let domain: String = row.try_get("domain")?;
        let status: String = row.try_get("status")?;
        let stop_reason: Option<String> = row.try_get("stop_reason")?;
        summaries.push(DomainRunSummary {
            domain: DomainId::new(domain)
                .map_err(|e| DatabaseError::Decode(format!("domain: {e}")))?,
            status: parse_enum("status", &status)?,
            stop_reason: stop_reason
                .map(|r| parse_enum("stop_reason", &r))
                .transpose()?,
            pages_fetched: to_usize("pages_fetched", row.try_get("pages_fetched")?)?,
            findings: to_usize("findings", row.try_get("findings")?)?,
            counts: counts_from_row(&row)?,
            error: row.try_get("error")?,
        });
    }
    Ok(summaries)
}

fn counts_from_row(row: &SqliteRow) -> Result<SeverityCounts> {
    Ok(SeverityCounts::new(
        to_u32("blocker", row.try_get("blocker")?)?,
        to_u32("high", row.try_get("high")?)?,
        to_u32("medium", row.try_get("medium")?)?,
        to_u32("low", row.try_get("low")?)?,
    ))
}
