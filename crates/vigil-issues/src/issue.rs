//! The persisted, deduplicated defect record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vigil_checks::{Finding, FindingDetail};
use vigil_core::{Category, DomainId, Fingerprint, IssueStatus, RunId, Severity};

/// One defect, tracked across runs by its fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Row identifier
    pub id: String,
    /// Stable identity
    pub fingerprint: Fingerprint,
    /// Domain the defect belongs to
    pub domain: DomainId,
    /// Check category
    pub category: Category,
    /// Rule that produced it
    pub rule_id: String,
    /// Current severity
    pub severity: Severity,
    /// Rule title
    pub title: String,
    /// Latest finding message
    pub description: String,
    /// Route for route-scoped rules, `None` for site-wide defects
    pub route: Option<String>,
    /// Page the defect was last observed on
    pub page_url: String,
    /// Evidence from the latest observation
    pub evidence: Vec<String>,
    /// Category payload of the latest observation
    pub detail: FindingDetail,
    /// Lifecycle status
    pub status: IssueStatus,
    /// Whether remediation can be applied mechanically
    pub auto_fixable: bool,
    /// Number of runs the defect was observed in
    pub occurrence_count: u32,
    /// Run that first observed the defect (since its last reopening)
    pub first_seen_run: RunId,
    /// Run that last observed the defect
    pub last_seen_run: RunId,
    /// When the defect was first observed
    pub first_seen_at: DateTime<Utc>,
    /// When the defect was last observed
    pub last_seen_at: DateTime<Utc>,
    /// When verification confirmed the fix
    pub verified_at: Option<DateTime<Utc>>,
    /// Set when verification found the defect still present
    pub needs_escalation: bool,
    /// How many times the defect came back after being closed
    pub reopen_count: u32,
}

impl Issue {
    /// New open issue from a first observation.
    #[must_use]
    pub fn open(
        fingerprint: Fingerprint,
        domain: &DomainId,
        finding: &Finding,
        severity: Severity,
        run: &RunId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            fingerprint,
            domain: domain.clone(),
            category: finding.category(),
            rule_id: finding.rule_id.clone(),
            severity,
            title: finding.title.clone(),
            description: finding.message.clone(),
            route: finding.identity_route().map(str::to_string),
            page_url: finding.page_url.clone(),
            evidence: finding.evidence.clone(),
            detail: finding.detail.clone(),
            status: IssueStatus::Open,
            auto_fixable: finding.auto_fixable,
            occurrence_count: 1,
            first_seen_run: run.clone(),
            last_seen_run: run.clone(),
            first_seen_at: now,
            last_seen_at: now,
            verified_at: None,
            needs_escalation: false,
            reopen_count: 0,
        }
    }

    /// Refresh the observation fields from a new finding.
    ///
    /// Counts once per run; severity and status are left to the caller.
    pub(crate) fn observe(&mut self, finding: &Finding, run: &RunId, now: DateTime<Utc>) {
        if &self.last_seen_run != run {
            self.occurrence_count += 1;
            self.last_seen_run = run.clone();
        }
        self.last_seen_at = now;
        self.description = finding.message.clone();
        self.page_url = finding.page_url.clone();
        self.evidence = finding.evidence.clone();
        self.detail = finding.detail.clone();
    }

    /// Restart the lifecycle of a recurring defect: open, counted from this
    /// run, with the new observation's severity.
    pub(crate) fn reopen(
        &mut self,
        finding: &Finding,
        severity: Severity,
        run: &RunId,
        now: DateTime<Utc>,
    ) {
        self.status = IssueStatus::Open;
        self.severity = severity;
        self.occurrence_count = 1;
        self.first_seen_run = run.clone();
        self.last_seen_run = run.clone();
        self.first_seen_at = now;
        self.last_seen_at = now;
        self.verified_at = None;
        self.reopen_count += 1;
        self.description = finding.message.clone();
        self.page_url = finding.page_url.clone();
        self.evidence = finding.evidence.clone();
        self.detail = finding.detail.clone();
    }

    /// Where the defect lives: its route, or the page it was last seen on
    /// for site-wide rules.
    #[must_use]
    pub fn location(&self) -> &str {
        self.route.as_deref().unwrap_or(&self.page_url)
    }
}
