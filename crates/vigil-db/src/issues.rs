//! Issue table operations.
//!
//! One row per fingerprint. Upserts replace every column but the row id, so
//! a defect keeps its identifier across runs.

use crate::codec::{parse_enum, parse_opt_time, parse_time, to_u32};
use crate::error::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use vigil_core::{DomainId, Fingerprint, IssueStatus, RunId};
use vigil_issues::{Issue, IssueFilter};

const COLUMNS: &str = "id, fingerprint, domain, category, rule_id, severity, title, description, \
     route, page_url, evidence, detail, status, auto_fixable, occurrence_count, first_seen_run, \
     last_seen_run, first_seen_at, last_seen_at, verified_at, needs_escalation, reopen_count";

/// Insert an issue, or update the existing row with the same fingerprint.
///
/// # Errors
/// Returns `DatabaseError` if serialization or the statement fails.
pub async fn upsert_issue(pool: &Pool<Sqlite>, issue: &Issue) -> Result<()> {
    let evidence = serde_json::to_string(&issue.evidence)?;
    let detail = serde_json::to_string(&issue.detail)?;

    sqlx::query(
        "INSERT INTO issues (id, fingerprint, domain, category, rule_id, severity, title, description,
                             route, page_url, evidence, detail, status, auto_fixable, occurrence_count,
                             first_seen_run, last_seen_run, first_seen_at, last_seen_at, verified_at,
                             needs_escalation, reopen_count)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(fingerprint) DO UPDATE SET
             domain = excluded.domain,
             category = excluded.category,
             rule_id = excluded.rule_id,
             severity = excluded.severity,
             title = excluded.title,
             description = excluded.description,
             route = excluded.route,
             page_url = excluded.page_url,
             evidence = excluded.evidence,
             detail = excluded.detail,
             status = excluded.status,
             auto_fixable = excluded.auto_fixable,
             occurrence_count = excluded.occurrence_count,
             first_seen_run = excluded.first_seen_run,
             last_seen_run = excluded.last_seen_run,
             first_seen_at = excluded.first_seen_at,
             last_seen_at = excluded.last_seen_at,
             verified_at = excluded.verified_at,
             needs_escalation = excluded.needs_escalation,
             reopen_count = excluded.reopen_count",
    )
    .bind(&issue.id)
    .bind(issue.fingerprint.as_str())
    .bind(issue.domain.as_str())
    .bind(issue.category.as_str())
    .bind(&issue.rule_id)
    .bind(issue.severity.as_str())
    .bind(&issue.title)
    .bind(&issue.description)
    .bind(issue.route.as_deref())
    .bind(&issue.page_url)
    .bind(evidence)
    .bind(detail)
    .bind(issue.status.as_str())
    .bind(issue.auto_fixable)
    .bind(i64::from(issue.occurrence_count))
    .bind(issue.first_seen_run.as_str())
    .bind(issue.last_seen_run.as_str())
    .bind(issue.first_seen_at.to_rfc3339())
    .bind(issue.last_seen_at.to_rfc3339())
    .bind(issue.verified_at.map(|t| t.to_rfc3339()))
    .bind(issue.needs_escalation)
    .bind(i64::from(issue.reopen_count))
    .execute(pool)
    .await?;

    Ok(())
}

/// Get an issue by fingerprint.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or the row cannot be decoded.
pub async fn get_issue(pool: &Pool<Sqlite>, fingerprint: &Fingerprint) -> Result<Option<Issue>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM issues WHERE fingerprint = ?"))
        .bind(fingerprint.as_str())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(issue_from_row).transpose()
}

/// List issues passing `filter`, ordered by fingerprint.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or a row cannot be decoded.
pub async fn list_issues(pool: &Pool<Sqlite>, filter: &IssueFilter) -> Result<Vec<Issue>> {
    let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM issues WHERE 1 = 1"));

    if let Some(run_id) = &filter.run_id {
        query.push(" AND last_seen_run = ").push_bind(run_id.as_str().to_string());
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(severity) = filter.severity {
        query.push(" AND severity = ").push_bind(severity.as_str());
    }
    if let Some(domain) = &filter.domain {
        query.push(" AND domain = ").push_bind(domain.as_str().to_string());
    }
    if let Some(category) = filter.category {
        query.push(" AND category = ").push_bind(category.as_str());
    }
    query.push(" ORDER BY fingerprint");

    let rows = query.build().fetch_all(pool).await?;
    rows.iter().map(issue_from_row).collect()
}

/// Set an issue's status. `at` becomes `verified_at` when moving to
/// `verified`.
///
/// # Errors
/// Returns `DatabaseError::NotFound` if no issue has this id.
pub async fn update_status(
    pool: &Pool<Sqlite>,
    issue_id: &str,
    status: IssueStatus,
    at: Option<DateTime<Utc>>,
) -> Result<()> {
    let result = if status == IssueStatus::Verified {
        sqlx::query("UPDATE issues SET status = ?, verified_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(at.map(|t| t.to_rfc3339()))
            .bind(issue_id)
            .execute(pool)
            .await?
    } else {
        sqlx::query("UPDATE issues SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(issue_id)
            .execute(pool)
            .await?
    };

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("issue not found: {issue_id}")));
    }
    Ok(())
}

/// Total number of issue rows.
///
/// # Errors
/// Returns `DatabaseError` if the query fails.
pub async fn count_issues(pool: &Pool<Sqlite>) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM issues")
        .fetch_one(pool)
        .await?)
}

fn issue_from_row(row: &SqliteRow) -> Result<Issue> {
    let fingerprint: String = row.try_get("fingerprint")?;
    let domain: String = row.try_get("domain")?;
    let category: String = row.try_get("category")?;
    let severity: String = row.try_get("severity")?;
    let status: String = row.try_get("status")?;
    let evidence: String = row.try_get("evidence")?;
    let detail: String = row.try_get("detail")?;
    let first_seen_at: String = row.try_get("first_seen_at")?;
    let last_seen_at: String = row.try_get("last_seen_at")?;

    Ok(Issue {
        id: row.try_get("id")?,
        fingerprint: Fingerprint::from_hex(fingerprint)
            .map_err(|e| DatabaseError::Decode(format!("fingerprint: {e}")))?,
        domain: DomainId::new(domain).map_err(|e| DatabaseError::Decode(format!("domain: {e}")))?,
        category: parse_enum("category", &category)?,
        rule_id: row.try_get("rule_id")?,
        severity: parse_enum("severity", &severity)?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        route: row.try_get("route")?,
        page_url: row.try_get("page_url")?,
        evidence: serde_json::from_str(&evidence)?,
        detail: serde_json::from_str(&detail)?,
        status: parse_enum("status", &status)?,
        auto_fixable: row.try_get("auto_fixable")?,
        occurrence_count: to_u32("occurrence_count", row.try_get("occurrence_count")?)?,
        first_seen_run: RunId::from_string(row.try_get::<String, _>("first_seen_run")?),
        last_seen_run: RunId::from_string(row.try_get::<String, _>("last_seen_run")?),
        first_seen_at: parse_time("first_seen_at", &first_seen_at)?,
        last_seen_at: parse_time("last_seen_at", &last_seen_at)?,
        verified_at: parse_opt_time("verified_at", row.try_get("verified_at")?)?,
        needs_escalation: row.try_get("needs_escalation")?,
        reopen_count: to_u32("reopen_count", row.try_get("reopen_count")?)?,
    })
}
