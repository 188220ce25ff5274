//! The Issue Assembler.
//!
//! [`IssueLedger`] turns findings into issue state transitions. It is pure
//! and synchronous: callers load the relevant issues and suppressions, feed
//! findings in, and persist [`IssueLedger::take_changes`] afterwards.

use crate::fingerprint::fingerprint;
use crate::issue::Issue;
use crate::severity::{classify, SeverityTable};
use crate::suppression::Suppression;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use vigil_checks::Finding;
use vigil_core::{DomainId, Fingerprint, IssueStatus, RunId, Severity, SeverityCounts};

/// What observing a finding did to its issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// No issue existed; one was opened
    Created,
    /// Existing open issue, occurrence recorded
    Updated,
    /// Existing open issue, severity raised
    Escalated,
    /// A closed issue came back and was opened again
    Reopened,
    /// Suppressed or won't-fix issue, observation recorded only
    Recorded,
}

/// Issue state for one or more domains, keyed by fingerprint.
#[derive(Debug, Clone)]
pub struct IssueLedger {
    table: SeverityTable,
    issues: HashMap<Fingerprint, Issue>,
    suppressions: HashMap<Fingerprint, Suppression>,
    observed: BTreeSet<Fingerprint>,
    dirty: BTreeSet<Fingerprint>,
}

impl IssueLedger {
    /// Empty ledger classifying with `table`.
    #[must_use]
    pub fn new(table: SeverityTable) -> Self {
        Self {
            table,
            issues: HashMap::new(),
            suppressions: HashMap::new(),
            observed: BTreeSet::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// Seed with previously persisted issues.
    #[must_use]
    pub fn with_issues(mut self, issues: impl IntoIterator<Item = Issue>) -> Self {
        self.issues
            .extend(issues.into_iter().map(|i| (i.fingerprint.clone(), i)));
        self
    }

    /// Seed with known suppressions.
    #[must_use]
    pub fn with_suppressions(mut self, suppressions: impl IntoIterator<Item = Suppression>) -> Self {
        self.suppressions
            .extend(suppressions.into_iter().map(|s| (s.fingerprint.clone(), s)));
        self
    }

    /// Severity of a finding: the table's verdict, or the module's hint
    /// when no table entry applies.
    #[must_use]
    pub fn classify(&self, finding: &Finding) -> Severity {
        classify(
            &self.table,
            finding.category(),
            &finding.rule_id,
            finding.metric,
        )
        .unwrap_or(finding.severity_hint)
    }

    /// Apply one finding observed on `domain` during `run`.
    pub fn observe(
        &mut self,
        domain: &DomainId,
        finding: &Finding,
        run: &RunId,
        now: DateTime<Utc>,
    ) -> (Fingerprint, Observation) {
        let fp = fingerprint(domain, finding);
        let severity = self.classify(finding);
        let suppressed = self.is_suppressed(&fp, now);

        let outcome = match self.issues.get_mut(&fp) {
            None => {
                let mut issue = Issue::open(fp.clone(), domain, finding, severity, run, now);
                if suppressed {
                    issue.status = IssueStatus::Suppressed;
                }
                self.issues.insert(fp.clone(), issue);
                Observation::Created
            }
            Some(issue) => match issue.status {
                IssueStatus::Open | IssueStatus::Fixing => {
                    issue.observe(finding, run, now);
                    if suppressed {
                        issue.status = IssueStatus::Suppressed;
                    }
                    if severity > issue.severity {
                        issue.severity = severity;
                        Observation::Escalated
                    } else {
                        Observation::Updated
                    }
                }
                IssueStatus::Suppressed if suppressed => {
                    issue.observe(finding, run, now);
                    Observation::Recorded
                }
                IssueStatus::WontFix => {
                    issue.observe(finding, run, now);
                    Observation::Recorded
                }
                IssueStatus::Verified | IssueStatus::Suppressed => {
                    issue.reopen(finding, severity, run, now);
                    Observation::Reopened
                }
            },
        };

        debug!(
            fingerprint = fp.short(),
            rule = %finding.rule_id,
            route = %finding.route,
            ?outcome,
            "observed finding"
        );

        self.observed.insert(fp.clone());
        self.dirty.insert(fp.clone());
        (fp, outcome)
    }

    /// Verification found the defect gone.
    ///
    /// Returns false when the fingerprint is not tracked.
    pub fn mark_verified(&mut self, fp: &Fingerprint, now: DateTime<Utc>) -> bool {
        let Some(issue) = self.issues.get_mut(fp) else {
            return false;
        };
        issue.status = IssueStatus::Verified;
        issue.verified_at = Some(now);
        issue.needs_escalation = false;
        self.dirty.insert(fp.clone());
        true
    }

    /// Verification found the defect still present: back to open, flagged
    /// for escalation, with the freshly classified severity.
    ///
    /// Returns false when the finding's fingerprint is not tracked.
    pub fn mark_persisting(
        &mut self,
        domain: &DomainId,
        finding: &Finding,
        run: &RunId,
        now: DateTime<Utc>,
    ) -> bool {
        let fp = fingerprint(domain, finding);
        let severity = self.classify(finding);
        let Some(issue) = self.issues.get_mut(&fp) else {
            return false;
        };
        issue.observe(finding, run, now);
        issue.status = IssueStatus::Open;
        issue.severity = severity;
        issue.needs_escalation = true;
        self.observed.insert(fp.clone());
        self.dirty.insert(fp);
        true
    }

    /// Tracked issue by fingerprint.
    #[must_use]
    pub fn get(&self, fp: &Fingerprint) -> Option<&Issue> {
        self.issues.get(fp)
    }

    /// Whether an active suppression covers `fp` at `now`.
    #[must_use]
    pub fn is_suppressed(&self, fp: &Fingerprint, now: DateTime<Utc>) -> bool {
        self.suppressions.get(fp).is_some_and(|s| s.is_active(now))
    }

    /// Issues observed since the ledger was built, in fingerprint order.
    pub fn observed(&self) -> impl Iterator<Item = &Issue> {
        self.observed.iter().filter_map(|fp| self.issues.get(fp))
    }

    /// Severity counts over observed issues that are open or being fixed
    /// and not suppressed. Each fingerprint counts once.
    #[must_use]
    pub fn counts(&self, now: DateTime<Utc>) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for issue in self.observed() {
            if issue.status.is_active() && !self.is_suppressed(&issue.fingerprint, now) {
                counts.record(issue.severity);
            }
        }
        counts
    }

    /// Issues changed since the last call, in fingerprint order.
    pub fn take_changes(&mut self) -> Vec<Issue> {
        std::mem::take(&mut self.dirty)
            .into_iter()
            .filter_map(|fp| self.issues.get(&fp).cloned())
            .collect()
    }

    /// Number of tracked issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// No tracked issues.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use url::Url;
    use vigil_checks::rules;

    fn domain() -> DomainId {
        DomainId::new("example.com").unwrap()
    }

    fn not_found(path: &str) -> Finding {
        rules::http_status(&Url::parse(&format!("https://example.com{path}")).unwrap(), 404)
    }

    fn server_error(path: &str) -> Finding {
        rules::http_status(&Url::parse(&format!("https://example.com{path}")).unwrap(), 500)
    }

    fn ledger() -> IssueLedger {
        IssueLedger::new(SeverityTable::builtin())
    }

    #[test]
    fn test_new_finding_opens_issue() {
        let mut ledger = ledger();
        let run = RunId::generate();
        let (fp, outcome) = ledger.observe(&domain(), &not_found("/a"), &run, Utc::now());

        assert_eq!(outcome, Observation::Created);
        let issue = ledger.get(&fp).unwrap();
        assert_eq!(issue.status, IssueStatus::Open);
        assert_eq!(issue.severity, Severity::High);
        assert_eq!(issue.occurrence_count, 1);
        assert_eq!(issue.first_seen_run, run);
        assert_eq!(issue.route.as_deref(), Some("/a"));
    }

    #[test]
    fn test_two_runs_one_issue_two_occurrences() {
        let mut ledger = ledger();
        let now = Utc::now();
        let (first_run, second_run) = (RunId::generate(), RunId::generate());

        let (fp, _) = ledger.observe(&domain(), &not_found("/a"), &first_run, now);
        // Same finding twice within a run counts once
        ledger.observe(&domain(), &not_found("/a"), &first_run, now);
        let (again, outcome) = ledger.observe(&domain(), &not_found("/a"), &second_run, now);

        assert_eq!(fp, again);
        assert_eq!(outcome, Observation::Updated);
        assert_eq!(ledger.len(), 1);
        let issue = ledger.get(&fp).unwrap();
        assert_eq!(issue.occurrence_count, 2);
        assert_eq!(issue.first_seen_run, first_run);
        assert_eq!(issue.last_seen_run, second_run);
    }

    #[test]
    fn test_severity_only_escalates() {
        let mut ledger = ledger();
        let run = RunId::generate();
        let now = Utc::now();

        let (fp, _) = ledger.observe(&domain(), &server_error("/a"), &run, now);
        assert_eq!(ledger.get(&fp).unwrap().severity, Severity::Blocker);

        // 404 and 500 on the same route share an identity; milder does not downgrade
        let (_, outcome) = ledger.observe(&domain(), &not_found("/a"), &run, now);
        assert_eq!(outcome, Observation::Updated);
        assert_eq!(ledger.get(&fp).unwrap().severity, Severity::Blocker);

        let mut other = ledger.clone();
        let (fp2, _) = other.observe(&domain(), &not_found("/b"), &run, now);
        let (_, outcome) = other.observe(&domain(), &server_error("/b"), &run, now);
        assert_eq!(outcome, Observation::Escalated);
        assert_eq!(other.get(&fp2).unwrap().severity, Severity::Blocker);
    }

    #[test]
    fn test_verified_issue_reopens_with_new_severity() {
        let mut ledger = ledger();
        let now = Utc::now();
        let (first, second) = (RunId::generate(), RunId::generate());

        let (fp, _) = ledger.observe(&domain(), &server_error("/a"), &first, now);
        assert!(ledger.mark_verified(&fp, now));

        let (_, outcome) = ledger.observe(&domain(), &not_found("/a"), &second, now);
        assert_eq!(outcome, Observation::Reopened);
        let issue = ledger.get(&fp).unwrap();
        assert_eq!(issue.status, IssueStatus::Open);
        assert_eq!(issue.severity, Severity::High);
        assert_eq!(issue.occurrence_count, 1);
        assert_eq!(issue.first_seen_run, second);
        assert_eq!(issue.reopen_count, 1);
        assert!(issue.verified_at.is_none());
    }

    #[test]
    fn test_active_suppression_records_without_reopening() {
        let now = Utc::now();
        let fp = fingerprint(&domain(), &not_found("/a"));
        let mut ledger =
            ledger().with_suppressions([Suppression::new(fp.clone(), "known", now)]);

        let (_, outcome) = ledger.observe(&domain(), &not_found("/a"), &RunId::generate(), now);
        assert_eq!(outcome, Observation::Created);
        assert_eq!(ledger.get(&fp).unwrap().status, IssueStatus::Suppressed);

        let (_, outcome) = ledger.observe(&domain(), &not_found("/a"), &RunId::generate(), now);
        assert_eq!(outcome, Observation::Recorded);
        assert_eq!(ledger.get(&fp).unwrap().occurrence_count, 2);
        assert_eq!(ledger.counts(now).total(), 0);
    }

    #[test]
    fn test_expired_suppression_reopens() {
        let now = Utc::now();
        let fp = fingerprint(&domain(), &not_found("/a"));
        let suppression =
            Suppression::new(fp.clone(), "until release", now).until(now + Duration::days(1));
        let mut ledger = ledger().with_suppressions([suppression]);

        ledger.observe(&domain(), &not_found("/a"), &RunId::generate(), now);
        assert_eq!(ledger.get(&fp).unwrap().status, IssueStatus::Suppressed);

        let later = now + Duration::days(2);
        let (_, outcome) = ledger.observe(&domain(), &not_found("/a"), &RunId::generate(), later);
        assert_eq!(outcome, Observation::Reopened);
        assert_eq!(ledger.get(&fp).unwrap().status, IssueStatus::Open);
    }

    #[test]
    fn test_wontfix_stays_closed() {
        let now = Utc::now();
        let mut ledger = ledger();
        let (fp, _) = ledger.observe(&domain(), &not_found("/a"), &RunId::generate(), now);

        let mut issue = ledger.get(&fp).unwrap().clone();
        issue.status = IssueStatus::WontFix;
        let mut ledger = IssueLedger::new(SeverityTable::builtin()).with_issues([issue]);

        let (_, outcome) = ledger.observe(&domain(), &not_found("/a"), &RunId::generate(), now);
        assert_eq!(outcome, Observation::Recorded);
        assert_eq!(ledger.get(&fp).unwrap().status, IssueStatus::WontFix);
    }

    #[test]
    fn test_counts_once_per_fingerprint() {
        let now = Utc::now();
        let run = RunId::generate();
        let mut ledger = ledger();
        ledger.observe(&domain(), &not_found("/a"), &run, now);
        ledger.observe(&domain(), &not_found("/a"), &run, now);
        ledger.observe(&domain(), &server_error("/b"), &run, now);

        assert_eq!(ledger.counts(now), SeverityCounts::new(1, 1, 0, 0));
    }

    #[test]
    fn test_take_changes_drains() {
        let mut ledger = ledger();
        ledger.observe(&domain(), &not_found("/a"), &RunId::generate(), Utc::now());
        assert_eq!(ledger.take_changes().len(), 1);
        assert!(ledger.take_changes().is_empty());
    }

    #[test]
    fn test_persisting_defect_flags_escalation() {
        let now = Utc::now();
        let mut ledger = ledger();
        let (fp, _) = ledger.observe(&domain(), &server_error("/a"), &RunId::generate(), now);

        let mut issue = ledger.get(&fp).unwrap().clone();
        issue.status = IssueStatus::Fixing;
        let mut ledger = IssueLedger::new(SeverityTable::builtin()).with_issues([issue]);

        assert!(ledger.mark_persisting(&domain(), &not_found("/a"), &RunId::generate(), now));
        let issue = ledger.get(&fp).unwrap();
        assert_eq!(issue.status, IssueStatus::Open);
        assert!(issue.needs_escalation);
        // Verification is the one path allowed to lower severity
        assert_eq!(issue.severity, Severity::High);
    }
}
