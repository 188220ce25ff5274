//! Persistence seams for issues, suppressions, trends and runs.

use crate::error::Result;
use crate::issue::Issue;
use crate::run::{DomainRunSummary, Run};
use crate::suppression::Suppression;
use crate::trend::TrendRow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vigil_core::{Category, DomainId, Fingerprint, IssueStatus, RunId, Severity};

/// Issue selection. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    /// Issues last seen in this run
    pub run_id: Option<RunId>,
    /// Issues with this status
    pub status: Option<IssueStatus>,
    /// Issues with this severity
    pub severity: Option<Severity>,
    /// Issues of this domain
    pub domain: Option<DomainId>,
    /// Issues of this category
    pub category: Option<Category>,
}

impl IssueFilter {
    /// Match everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to issues last seen in `run_id`.
    #[must_use]
    pub fn run(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Restrict to `status`.
    #[must_use]
    pub fn status(mut self, status: IssueStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to `severity`.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Restrict to `domain`.
    #[must_use]
    pub fn domain(mut self, domain: DomainId) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Restrict to `category`.
    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Whether `issue` passes the filter.
    #[must_use]
    pub fn matches(&self, issue: &Issue) -> bool {
        self.run_id.as_ref().map_or(true, |r| &issue.last_seen_run == r)
            && self.status.map_or(true, |s| issue.status == s)
            && self.severity.map_or(true, |s| issue.severity == s)
            && self.domain.as_ref().map_or(true, |d| &issue.domain == d)
            && self.category.map_or(true, |c| issue.category == c)
    }
}

/// Issue and suppression persistence.
///
/// Upserts are idempotent and keyed by fingerprint: at most one row per
/// fingerprint exists.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Insert or replace the issue with this fingerprint.
    async fn upsert_issue(&self, issue: &Issue) -> Result<()>;

    /// Issue by fingerprint.
    async fn get_issue(&self, fingerprint: &Fingerprint) -> Result<Option<Issue>>;

    /// Issues passing `filter`, ordered by fingerprint.
    async fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>>;

    /// Set an issue's status. `at` is recorded as the verification time
    /// when moving to `verified`.
    async fn update_status(
        &self,
        issue_id: &str,
        status: IssueStatus,
        at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Record a suppression and mark the matching issue suppressed.
    async fn add_suppression(&self, suppression: &Suppression) -> Result<()>;

    /// All suppressions, expired ones included.
    async fn list_suppressions(&self) -> Result<Vec<Suppression>>;

    /// Delete a suppression. Returns whether one existed.
    async fn remove_suppression(&self, fingerprint: &Fingerprint) -> Result<bool>;
}

/// Append-only trend storage.
#[async_trait]
pub trait TrendStore: Send + Sync {
    /// Insert rows; an existing `(domain, category, date)` row is kept.
    /// Returns how many rows were inserted.
    async fn record_trends(&self, rows: &[TrendRow]) -> Result<usize>;

    /// Rows of one domain, ordered by date then category.
    async fn list_trends(&self, domain: &DomainId) -> Result<Vec<TrendRow>>;
}

/// Run persistence.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Record a started run.
    async fn create_run(&self, run: &Run) -> Result<()>;

    /// Persist a run's terminal state.
    async fn finish_run(&self, run: &Run) -> Result<()>;

    /// Record one domain's outcome within a run.
    async fn record_domain_run(&self, run_id: &RunId, summary: &DomainRunSummary) -> Result<()>;

    /// Run by id.
    async fn get_run(&self, run_id: &RunId) -> Result<Option<Run>>;

    /// Domain outcomes of a run.
    async fn list_domain_runs(&self, run_id: &RunId) -> Result<Vec<DomainRunSummary>>;
}

/// Everything an audit run persists.
pub trait AuditStore: IssueStore + TrendStore + RunStore {}

impl<T: IssueStore + TrendStore + RunStore> AuditStore for T {}
