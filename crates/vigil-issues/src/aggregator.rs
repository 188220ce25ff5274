//! Run-level health: severity counts and the go/no-go verdict.

use crate::run::DomainRunSummary;
use vigil_core::{SeverityConfig, SeverityCounts, Verdict};

/// Default HIGH count above which a run turns YELLOW.
pub const DEFAULT_YELLOW_HIGH_THRESHOLD: u32 = 10;

/// Verdict thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoNoGoPolicy {
    /// HIGH count strictly above which the verdict is YELLOW
    pub yellow_high_threshold: u32,
}

impl Default for GoNoGoPolicy {
    fn default() -> Self {
        Self {
            yellow_high_threshold: DEFAULT_YELLOW_HIGH_THRESHOLD,
        }
    }
}

impl GoNoGoPolicy {
    /// Policy from the severity configuration.
    #[must_use]
    pub fn from_config(config: &SeverityConfig) -> Self {
        Self {
            yellow_high_threshold: config.yellow_high_threshold,
        }
    }

    /// RED on any BLOCKER, YELLOW when HIGH exceeds the threshold, GREEN
    /// otherwise.
    #[must_use]
    pub fn verdict(&self, counts: &SeverityCounts) -> Verdict {
        if counts.blocker > 0 {
            Verdict::Red
        } else if counts.high > self.yellow_high_threshold {
            Verdict::Yellow
        } else {
            Verdict::Green
        }
    }
}

/// Verdict under the default policy.
#[must_use]
pub fn go_no_go(counts: &SeverityCounts) -> Verdict {
    GoNoGoPolicy::default().verdict(counts)
}

/// Accumulates per-domain outcomes of a run.
#[derive(Debug, Clone, Default)]
pub struct RunAggregator {
    policy: GoNoGoPolicy,
    counts: SeverityCounts,
    domains: Vec<DomainRunSummary>,
}

impl RunAggregator {
    /// Empty aggregator using `policy`.
    #[must_use]
    pub fn new(policy: GoNoGoPolicy) -> Self {
        Self {
            policy,
            counts: SeverityCounts::default(),
            domains: Vec::new(),
        }
    }

    /// Add one domain's outcome.
    pub fn record(&mut self, summary: DomainRunSummary) {
        self.counts.merge(&summary.counts);
        self.domains.push(summary);
    }

    /// Counts summed over all recorded domains.
    #[must_use]
    pub fn counts(&self) -> SeverityCounts {
        self.counts
    }

    /// Current verdict.
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        self.policy.verdict(&self.counts)
    }

    /// Recorded domain outcomes, in completion order.
    #[must_use]
    pub fn domains(&self) -> &[DomainRunSummary] {
        &self.domains
    }

    /// Consume into the recorded outcomes.
    #[must_use]
    pub fn into_domains(self) -> Vec<DomainRunSummary> {
        self.domains
    }
}
