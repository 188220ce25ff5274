//! Run orchestration.
//!
//! This module provides the `AuditOrchestrator`, which audits a set of
//! domains in tier order with a bounded worker pool, feeds each domain's
//! findings through the issue ledger, persists issues and trends, and
//! finishes the run with its go/no-go verdict.

use crate::engine::CrawlEngine;
use crate::error::Result;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use vigil_browser::FetcherFactory;
use vigil_checks::CheckRegistry;
use vigil_core::{AppConfig, DomainConfig, DomainStatus, RunId, RunStatus, StopReason};
use vigil_issues::{
    rollup, AuditStore, DomainRunSummary, FixPacket, FixPacketGenerator, GoNoGoPolicy,
    IssueFilter, IssueLedger, Run, RunAggregator, SeverityTable, Suppression,
};

/// Final state of an audit run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The finished run
    pub run: Run,
    /// Per-domain outcomes, in completion order
    pub domains: Vec<DomainRunSummary>,
}

/// One domain's audit result.
struct DomainAudit {
    summary: DomainRunSummary,
    store_errors: u32,
}

/// Shared per-run inputs of domain audits.
struct RunContext<'a> {
    run_id: &'a RunId,
    engine: &'a CrawlEngine,
    table: &'a SeverityTable,
    suppressions: &'a [Suppression],
    deadline: Instant,
    cancel: &'a CancellationToken,
}

/// Orchestrates audit runs across domains.
pub struct AuditOrchestrator {
    /// Registered check modules
    registry: Arc<CheckRegistry>,
    /// Per-domain fetcher source
    factory: Arc<dyn FetcherFactory>,
    /// Issue, trend and run persistence
    store: Arc<dyn AuditStore>,
    /// Run, severity and domain settings
    config: AppConfig,
}

impl AuditOrchestrator {
    /// Create a new orchestrator.
    #[must_use]
    pub fn new(
        registry: Arc<CheckRegistry>,
        factory: Arc<dyn FetcherFactory>,
        store: Arc<dyn AuditStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            registry,
            factory,
            store,
            config,
        }
    }

    /// Audit every enabled configured domain.
    pub async fn run(&self, cancel: &CancellationToken) -> RunReport {
        self.run_domains(self.config.enabled_domains(), cancel).await
    }

    /// Audit an explicit domain list.
    ///
    /// Disabled domains are dropped; the rest are started in tier order with
    /// at most `run.worker_pool` audited at once. Once the run deadline
    /// fires or `cancel` is triggered, domains not yet started are recorded
    /// as skipped and in-progress crawls stop admitting new fetches.
    pub async fn run_domains(
        &self,
        mut domains: Vec<DomainConfig>,
        cancel: &CancellationToken,
    ) -> RunReport {
        domains.retain(|d| d.enabled);
        domains.sort_by(|a, b| a.tier.cmp(&b.tier).then_with(|| a.hostname.cmp(&b.hostname)));

        let run_id = RunId::generate();
        let mut run = Run::start(run_id.clone(), Utc::now());
        let mut store_errors = 0u32;

        if let Err(e) = self.store.create_run(&run).await {
            error!(run_id = %run_id, "failed to record run start: {}", e);
            store_errors += 1;
        }

        let suppressions = match self.store.list_suppressions().await {
            Ok(suppressions) => suppressions,
            Err(e) => {
                error!(run_id = %run_id, "failed to load suppressions: {}", e);
                store_errors += 1;
                Vec::new()
            }
        };

        let engine = CrawlEngine::for_categories(&self.registry, &self.config.run.categories);
        let table = SeverityTable::from_config(&self.config.severity);
        let context = RunContext {
            run_id: &run_id,
            engine: &engine,
            table: &table,
            suppressions: &suppressions,
            deadline: Instant::now() + self.config.run.max_runtime(),
            cancel,
        };

        info!(
            run_id = %run_id,
            domains = domains.len(),
            workers = self.config.run.worker_pool,
            "audit run started"
        );

        let mut aggregator = RunAggregator::new(GoNoGoPolicy::from_config(&self.config.severity));
        let mut pending = FuturesUnordered::new();
        let worker_pool = self.config.run.worker_pool.max(1);

        for domain in domains {
            if let Some(reason) = run_interruption(cancel, context.deadline) {
                info!(domain = %domain.hostname, reason = %reason, "domain skipped");
                let mut summary = DomainRunSummary::new(domain.hostname.clone(), DomainStatus::Skipped);
                summary.stop_reason = Some(reason);
                store_errors += self.record_domain(&run_id, &summary).await;
                aggregator.record(summary);
                continue;
            }

            pending.push(self.audit_domain(&context, domain));

            // Respect worker pool limit
            while pending.len() >= worker_pool {
                if let Some(audit) = pending.next().await {
                    store_errors += self.finish_domain(&run_id, audit, &mut aggregator).await;
                }
            }
        }

        while let Some(audit) = pending.next().await {
            store_errors += self.finish_domain(&run_id, audit, &mut aggregator).await;
        }

        let deadline_hit = Instant::now() >= context.deadline
            || aggregator
                .domains()
                .iter()
                .any(|s| s.stop_reason == Some(StopReason::Deadline));

        let summaries = aggregator.domains();
        let status = if cancel.is_cancelled() {
            RunStatus::Cancelled
        } else if !summaries.is_empty()
            && summaries.iter().all(|s| s.status == DomainStatus::Failed)
        {
            RunStatus::Failed
        } else {
            RunStatus::Complete
        };

        run.deadline_hit = deadline_hit;
        run.store_errors = store_errors;
        run.finish(status, aggregator.counts(), aggregator.verdict(), Utc::now());

        if let Err(e) = self.store.finish_run(&run).await {
            error!(run_id = %run_id, "failed to record run end: {}", e);
            run.store_errors += 1;
        }

        info!(
            run_id = %run_id,
            status = %run.status,
            blocker = run.counts.blocker,
            high = run.counts.high,
            medium = run.counts.medium,
            low = run.counts.low,
            verdict = %aggregator.verdict(),
            deadline_hit,
            store_errors = run.store_errors,
            "audit run finished"
        );

        RunReport {
            run,
            domains: aggregator.into_domains(),
        }
    }

    /// Fix packet over the issues last seen in `run_id`.
    ///
    /// # Errors
    /// Returns `CrawlError::Store` if issues or suppressions cannot be read.
    pub async fn fix_packet(
        &self,
        run_id: &RunId,
        generator: FixPacketGenerator,
    ) -> Result<FixPacket> {
        let issues = self
            .store
            .list_issues(&IssueFilter::all().run(run_id.clone()))
            .await?;
        let suppressions = self.store.list_suppressions().await?;
        Ok(generator.generate(run_id, &issues, &suppressions, Utc::now()))
    }

    /// Crawl one domain and push its findings through the ledger.
    async fn audit_domain(&self, context: &RunContext<'_>, domain: DomainConfig) -> DomainAudit {
        let id = domain.hostname.clone();
        let mut store_errors = 0u32;

        let outcome = match context
            .engine
            .crawl_domain(
                &domain,
                self.factory.as_ref(),
                Some(context.deadline),
                context.cancel,
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(domain = %id, "domain audit failed: {}", e);
                let mut summary = DomainRunSummary::new(id, DomainStatus::Failed);
                summary.error = Some(e.to_string());
                return DomainAudit {
                    summary,
                    store_errors,
                };
            }
        };

        let existing = match self
            .store
            .list_issues(&IssueFilter::all().domain(id.clone()))
            .await
        {
            Ok(issues) => issues,
            Err(e) => {
                error!(domain = %id, "failed to load tracked issues: {}", e);
                store_errors += 1;
                Vec::new()
            }
        };

        let mut ledger = IssueLedger::new(context.table.clone())
            .with_issues(existing)
            .with_suppressions(context.suppressions.iter().cloned());

        let now = Utc::now();
        for finding in &outcome.findings {
            ledger.observe(&id, finding, context.run_id, now);
        }
        let counts = ledger.counts(now);

        for issue in ledger.take_changes() {
            if let Err(e) = self.store.upsert_issue(&issue).await {
                error!(
                    domain = %id,
                    fingerprint = %issue.fingerprint.short(),
                    "failed to persist issue: {}",
                    e
                );
                store_errors += 1;
            }
        }

        let trends = rollup(
            &id,
            now.date_naive(),
            &self.config.run.categories,
            ledger.observed(),
        );
        if let Err(e) = self.store.record_trends(&trends).await {
            error!(domain = %id, "failed to record trends: {}", e);
            store_errors += 1;
        }

        let status = if outcome.is_partial() {
            DomainStatus::Partial
        } else {
            DomainStatus::Complete
        };
        let mut summary = DomainRunSummary::new(id, status);
        summary.stop_reason = Some(outcome.stop_reason);
        summary.pages_fetched = outcome.pages_fetched;
        summary.findings = outcome.findings.len();
        summary.counts = counts;

        DomainAudit {
            summary,
            store_errors,
        }
    }

    async fn finish_domain(
        &self,
        run_id: &RunId,
        audit: DomainAudit,
        aggregator: &mut RunAggregator,
    ) -> u32 {
        let summary = audit.summary;
        info!(
            domain = %summary.domain,
            status = %summary.status,
            pages = summary.pages_fetched,
            findings = summary.findings,
            "domain audited"
        );
        let errors = audit.store_errors + self.record_domain(run_id, &summary).await;
        aggregator.record(summary);
        errors
    }

    /// Persist a domain outcome; returns the number of failed writes.
    async fn record_domain(&self, run_id: &RunId, summary: &DomainRunSummary) -> u32 {
        match self.store.record_domain_run(run_id, summary).await {
            Ok(()) => 0,
            Err(e) => {
                error!(domain = %summary.domain, "failed to record domain outcome: {}", e);
                1
            }
        }
    }
}

fn run_interruption(cancel: &CancellationToken, deadline: Instant) -> Option<StopReason> {
    if cancel.is_cancelled() {
        Some(StopReason::Cancelled)
    } else if Instant::now() >= deadline {
        Some(StopReason::Deadline)
    } else {
        None
    }
}
