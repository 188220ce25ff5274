//! Daily per-(domain, category) rollups.

use crate::issue::Issue;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vigil_core::{Category, DomainId, SeverityCounts};

/// One day's issue picture for a domain and category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendRow {
    /// Domain
    pub domain: DomainId,
    /// Category
    pub category: Category,
    /// Day (UTC)
    pub date: NaiveDate,
    /// Observed issues still open or being fixed
    pub open_issues: u32,
    /// Observed issues per severity, suppressed ones included
    pub counts: SeverityCounts,
    /// 0–100 health score derived from `counts`
    pub score: u32,
}

/// `max(0, 100 − 25·BLOCKER − 10·HIGH − 3·MEDIUM − LOW)`
#[must_use]
pub fn score(counts: &SeverityCounts) -> u32 {
    let penalty = u64::from(counts.blocker) * 25
        + u64::from(counts.high) * 10
        + u64::from(counts.medium) * 3
        + u64::from(counts.low);
    u32::try_from(100u64.saturating_sub(penalty)).unwrap_or(0)
}

/// Roll observed issues of one domain into one row per category.
///
/// Every category in `categories` gets a row, so a clean category records
/// a perfect score rather than a gap.
#[must_use]
pub fn rollup<'a>(
    domain: &DomainId,
    date: NaiveDate,
    categories: &[Category],
    issues: impl IntoIterator<Item = &'a Issue>,
) -> Vec<TrendRow> {
    let mut rows: Vec<TrendRow> = categories
        .iter()
        .map(|&category| TrendRow {
            domain: domain.clone(),
            category,
            date,
            open_issues: 0,
            counts: SeverityCounts::default(),
            score: 100,
        })
        .collect();

    for issue in issues {
        if &issue.domain != domain {
            continue;
        }
        if let Some(row) = rows.iter_mut().find(|r| r.category == issue.category) {
            row.counts.record(issue.severity);
            if issue.status.is_active() {
                row.open_issues += 1;
            }
        }
    }

    for row in &mut rows {
        row.score = score(&row.counts);
    }
    rows
}
