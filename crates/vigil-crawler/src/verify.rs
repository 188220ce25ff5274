//! Targeted re-checks of issues after a fix attempt.
//!
//! Each issue's page is fetched again and only the check modules of the
//! issue's category run on it. A fresh finding with the issue's fingerprint
//! means the defect persists; no such finding means it is verified. Fresh
//! findings nobody tracks yet become new issues.

use crate::engine::CrawlEngine;
use crate::error::Result;
use crate::pacer::RatePacer;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;
use vigil_browser::FetcherFactory;
use vigil_checks::CheckRegistry;
use vigil_core::{Category, DomainConfig, DomainId, Fingerprint, IssueStatus, RunId};
use vigil_issues::{
    fingerprint, Issue, IssueFilter, IssueLedger, IssueStore, Observation, SeverityTable,
};

/// Outcome of one verification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    /// Run the re-checks were attributed to
    pub run_id: Option<RunId>,
    /// Issues confirmed fixed
    pub verified: Vec<Fingerprint>,
    /// Issues still present, back to open and flagged for escalation
    pub reopened: Vec<Fingerprint>,
    /// Issues whose page could not be checked; status unchanged
    pub inconclusive: Vec<Fingerprint>,
    /// Defects found on the re-checked pages that were not tracked before
    pub new_issues: Vec<Fingerprint>,
    /// Issue writes that failed
    pub store_errors: u32,
}

impl VerificationReport {
    fn new(run_id: RunId) -> Self {
        Self {
            run_id: Some(run_id),
            ..Self::default()
        }
    }
}

/// Re-checks issues against freshly fetched pages.
pub struct VerificationEngine {
    registry: Arc<CheckRegistry>,
    factory: Arc<dyn FetcherFactory>,
    table: SeverityTable,
}

impl VerificationEngine {
    /// Create a verification engine.
    #[must_use]
    pub fn new(
        registry: Arc<CheckRegistry>,
        factory: Arc<dyn FetcherFactory>,
        table: SeverityTable,
    ) -> Self {
        Self {
            registry,
            factory,
            table,
        }
    }

    /// Verify every issue currently in `fixing`.
    ///
    /// # Errors
    /// Returns `CrawlError::Store` if the issues cannot be listed.
    pub async fn verify_fixing(
        &self,
        store: &dyn IssueStore,
        domains: &[DomainConfig],
    ) -> Result<VerificationReport> {
        let issues = store
            .list_issues(&IssueFilter::all().status(IssueStatus::Fixing))
            .await?;
        self.verify_issues(store, domains, issues).await
    }

    /// Verify an explicit set of issues.
    ///
    /// Domains missing from `domains` are checked with default settings.
    ///
    /// # Errors
    /// Returns `CrawlError::Store` if the tracked issues or suppressions of
    /// a domain cannot be read.
    pub async fn verify_issues(
        &self,
        store: &dyn IssueStore,
        domains: &[DomainConfig],
        issues: Vec<Issue>,
    ) -> Result<VerificationReport> {
        let run_id = RunId::generate();
        let mut report = VerificationReport::new(run_id.clone());

        let mut by_domain: BTreeMap<DomainId, Vec<Issue>> = BTreeMap::new();
        for issue in issues {
            by_domain.entry(issue.domain.clone()).or_default().push(issue);
        }

        info!(run_id = %run_id, domains = by_domain.len(), "verification started");

        for (domain_id, issues) in by_domain {
            let config = domains
                .iter()
                .find(|d| d.hostname == domain_id)
                .cloned()
                .unwrap_or_else(|| DomainConfig::new(domain_id.clone()));
            self.verify_domain(store, &config, issues, &run_id, &mut report)
                .await?;
        }

        info!(
            run_id = %run_id,
            verified = report.verified.len(),
            reopened = report.reopened.len(),
            inconclusive = report.inconclusive.len(),
            new_issues = report.new_issues.len(),
            "verification finished"
        );
        Ok(report)
    }

    async fn verify_domain(
        &self,
        store: &dyn IssueStore,
        domain: &DomainConfig,
        issues: Vec<Issue>,
        run_id: &RunId,
        report: &mut VerificationReport,
    ) -> Result<()> {
        let domain_id = &domain.hostname;

        let root = match domain.root_url() {
            Ok(root) => root,
            Err(e) => {
                warn!(domain = %domain_id, "cannot verify: {}", e);
                report
                    .inconclusive
                    .extend(issues.into_iter().map(|i| i.fingerprint));
                return Ok(());
            }
        };

        let tracked = store
            .list_issues(&IssueFilter::all().domain(domain_id.clone()))
            .await?;
        let suppressions = store.list_suppressions().await?;
        let mut ledger = IssueLedger::new(self.table.clone())
            .with_issues(tracked)
            .with_suppressions(suppressions);

        let fetcher = match self.factory.open(domain).await {
            Ok(fetcher) => fetcher,
            Err(e) => {
                warn!(domain = %domain_id, "cannot verify, fetcher unavailable: {}", e);
                report
                    .inconclusive
                    .extend(issues.into_iter().map(|i| i.fingerprint));
                return Ok(());
            }
        };
        let pacer = RatePacer::new(domain.min_fetch_interval());

        let mut by_page: BTreeMap<String, Vec<Issue>> = BTreeMap::new();
        for issue in issues {
            by_page.entry(issue.page_url.clone()).or_default().push(issue);
        }

        for (page_url, issues) in by_page {
            let Ok(url) = Url::parse(&page_url) else {
                warn!(domain = %domain_id, url = %page_url, "unparsable issue URL");
                report
                    .inconclusive
                    .extend(issues.into_iter().map(|i| i.fingerprint));
                continue;
            };

            let categories: Vec<Category> = issues
                .iter()
                .map(|i| i.category)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let engine = CrawlEngine::for_categories(&self.registry, &categories);
            let probe = engine
                .probe(domain, &root, url, fetcher.as_ref(), &pacer)
                .await;

            let now = Utc::now();
            let fresh: Vec<(Fingerprint, _)> = probe
                .findings
                .iter()
                .map(|f| (fingerprint(domain_id, f), f))
                .collect();

            let mut rechecked = HashSet::new();
            for issue in &issues {
                if !probe.settles(&issue.rule_id) {
                    report.inconclusive.push(issue.fingerprint.clone());
                    continue;
                }
                rechecked.insert(issue.fingerprint.clone());

                match fresh.iter().find(|(fp, _)| fp == &issue.fingerprint) {
                    Some((_, finding)) => {
                        ledger.mark_persisting(domain_id, finding, run_id, now);
                        report.reopened.push(issue.fingerprint.clone());
                    }
                    None => {
                        ledger.mark_verified(&issue.fingerprint, now);
                        report.verified.push(issue.fingerprint.clone());
                    }
                }
            }

            for (fp, finding) in &fresh {
                if rechecked.contains(fp) || ledger.get(fp).is_some() {
                    continue;
                }
                if let (fp, Observation::Created) = ledger.observe(domain_id, finding, run_id, now) {
                    report.new_issues.push(fp);
                }
            }
        }

        if let Err(e) = fetcher.close().await {
            warn!(domain = %domain_id, "failed to close fetcher: {}", e);
        }

        for issue in ledger.take_changes() {
            if let Err(e) = store.upsert_issue(&issue).await {
                error!(fingerprint = %issue.fingerprint.short(), "failed to persist issue: {}", e);
                report.store_errors += 1;
            }
        }

        Ok(())
    }
}
