//! Run records and per-domain outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vigil_core::{DomainId, DomainStatus, RunId, RunStatus, SeverityCounts, StopReason, Verdict};

/// One audit execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Run identifier
    pub id: RunId,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time, once terminal
    pub ended_at: Option<DateTime<Utc>>,
    /// Lifecycle status
    pub status: RunStatus,
    /// Severity counts across all domains
    pub counts: SeverityCounts,
    /// Go/no-go verdict, once terminal
    pub verdict: Option<Verdict>,
    /// Whether the run-level deadline stopped the run
    pub deadline_hit: bool,
    /// Persistence failures tolerated during the run
    pub store_errors: u32,
}

impl Run {
    /// A run that has just started.
    #[must_use]
    pub fn start(id: RunId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            started_at: now,
            ended_at: None,
            status: RunStatus::Running,
            counts: SeverityCounts::default(),
            verdict: None,
            deadline_hit: false,
            store_errors: 0,
        }
    }

    /// Move to a terminal status.
    pub fn finish(
        &mut self,
        status: RunStatus,
        counts: SeverityCounts,
        verdict: Verdict,
        now: DateTime<Utc>,
    ) {
        self.status = status;
        self.counts = counts;
        self.verdict = Some(verdict);
        self.ended_at = Some(now);
    }
}

/// Outcome of one domain within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRunSummary {
    /// Audited domain
    pub domain: DomainId,
    /// Outcome
    pub status: DomainStatus,
    /// Why traversal stopped, when it ran
    pub stop_reason: Option<StopReason>,
    /// Pages fetched (redirect hops included)
    pub pages_fetched: usize,
    /// Findings produced
    pub findings: usize,
    /// Severity counts contributed to the run
    pub counts: SeverityCounts,
    /// Failure description for failed domains
    pub error: Option<String>,
}

impl DomainRunSummary {
    /// Summary with no activity recorded yet.
    #[must_use]
    pub fn new(domain: DomainId, status: DomainStatus) -> Self {
        Self {
            domain,
            status,
            stop_reason: None,
            pages_fetched: 0,
            findings: 0,
            counts: SeverityCounts::default(),
            error: None,
        }
    }
}
