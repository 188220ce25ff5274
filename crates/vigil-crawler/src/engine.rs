//! Budgeted breadth-first crawl of one domain.
//!
//! The engine owns nothing between crawls. Each call gets a fetcher scoped
//! to the domain, paces fetch starts to the domain's rate cap, keeps up to
//! `max_concurrency` fetches in flight, and turns every outcome into
//! findings: fetch errors, error statuses and redirect problems are emitted
//! here, everything else comes from the resolved check modules.

use crate::error::Result;
use crate::normalize::{normalize, same_origin};
use crate::pacer::RatePacer;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashSet, VecDeque};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;
use vigil_browser::{FetchedPage, FetcherFactory, PageFetcher};
use vigil_checks::{rules, CheckRegistry, Finding, ResolvedChecks};
use vigil_core::{Category, DomainConfig, StopReason};

/// Redirect hops followed from one requested URL.
pub const MAX_REDIRECT_HOPS: usize = 3;

/// What one domain crawl produced.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Findings in the order their pages completed
    pub findings: Vec<Finding>,
    /// Fetches performed, redirect hops included
    pub pages_fetched: usize,
    /// Why traversal ended
    pub stop_reason: StopReason,
}

impl CrawlOutcome {
    /// Traversal ended with frontier remaining.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.stop_reason.is_partial()
    }
}

/// A frontier entry.
#[derive(Debug, Clone)]
pub(crate) struct Visit {
    pub url: Url,
    pub depth: usize,
    /// Earlier URLs of the redirect chain that led here
    pub chain: Vec<Url>,
}

impl Visit {
    pub(crate) fn new(url: Url, depth: usize) -> Self {
        Self {
            url,
            depth,
            chain: Vec::new(),
        }
    }
}

/// Findings and follow-ups from one fetch.
#[derive(Debug, Default)]
pub(crate) struct Evaluation {
    pub findings: Vec<Finding>,
    /// Same-origin redirect target and the chain so far
    pub redirect: Option<(Url, Vec<Url>)>,
    /// Same-origin links of a successful page
    pub links: Vec<Url>,
    /// Check modules ran on the page
    pub inspected: bool,
}

/// Result of re-checking one URL, redirects followed.
#[derive(Debug)]
pub(crate) struct Probe {
    pub findings: Vec<Finding>,
    /// The last fetch got a response
    pub responded: bool,
    /// Check modules ran on the final page
    pub inspected: bool,
}

impl Probe {
    /// Whether this probe observed enough to decide an issue of `rule_id`.
    ///
    /// A fetch failure is settled by any attempt, other fetch outcomes need
    /// a response, and module rules need the modules to have run.
    pub(crate) fn settles(&self, rule_id: &str) -> bool {
        if rule_id == rules::FETCH_FAILED.id {
            true
        } else if rules::is_fetch_outcome(rule_id) {
            self.responded
        } else {
            self.inspected
        }
    }
}

/// Crawls domains with a fixed set of check modules.
#[derive(Debug, Clone)]
pub struct CrawlEngine {
    checks: ResolvedChecks,
    report_external_links: bool,
}

impl CrawlEngine {
    /// Engine running `checks` on every fetched page.
    #[must_use]
    pub fn new(checks: ResolvedChecks) -> Self {
        Self {
            checks,
            report_external_links: false,
        }
    }

    /// Engine for a run's category set. External links are reported when
    /// link integrity is among the categories.
    #[must_use]
    pub fn for_categories(registry: &CheckRegistry, categories: &[Category]) -> Self {
        Self::new(registry.resolve(categories))
            .report_external_links(categories.contains(&Category::LinkIntegrity))
    }

    /// Emit `links.external_link` findings for off-origin links.
    #[must_use]
    pub fn report_external_links(mut self, enabled: bool) -> Self {
        self.report_external_links = enabled;
        self
    }

    /// Acquire a fetcher for `domain`, crawl, and close the fetcher whatever
    /// the outcome.
    ///
    /// # Errors
    /// Returns `CrawlError::Fetcher` if no fetcher could be acquired and
    /// `CrawlError::Config` if the domain's root URL is unusable.
    pub async fn crawl_domain(
        &self,
        domain: &DomainConfig,
        factory: &dyn FetcherFactory,
        run_deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<CrawlOutcome> {
        let fetcher = factory.open(domain).await?;
        let outcome = self
            .crawl(domain, fetcher.as_ref(), run_deadline, cancel)
            .await;
        if let Err(e) = fetcher.close().await {
            warn!(domain = %domain.hostname, "failed to close fetcher: {}", e);
        }
        outcome
    }

    /// Breadth-first traversal from the domain's root URL.
    ///
    /// Stops at the first of: empty frontier, page budget, depth budget,
    /// the domain's runtime budget, `run_deadline`, or cancellation. Fetches
    /// already started when a deadline fires are allowed to finish; no new
    /// ones start.
    ///
    /// # Errors
    /// Returns `CrawlError::Config` if the domain's root URL is unusable.
    pub async fn crawl(
        &self,
        domain: &DomainConfig,
        fetcher: &dyn PageFetcher,
        run_deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<CrawlOutcome> {
        let root = domain.root_url()?;
        let budget_deadline = Instant::now() + domain.max_runtime();
        let fetch_deadline = run_deadline.map_or(budget_deadline, |d| d.min(budget_deadline));
        let pacer = RatePacer::new(domain.min_fetch_interval());
        let max_in_flight = domain.max_concurrency.max(1);

        let mut frontier = VecDeque::new();
        let mut visited = HashSet::new();
        let mut external_seen = HashSet::new();
        visited.insert(normalize(&root));
        frontier.push_back(Visit::new(root.clone(), 0));

        let mut findings = Vec::new();
        let mut admitted = 0usize;
        let mut pages_fetched = 0usize;
        let mut depth_limited = false;
        let mut stop: Option<StopReason> = None;
        let mut in_flight = FuturesUnordered::new();

        info!(domain = %domain.hostname, root = %root, "crawl started");

        loop {
            while stop.is_none() && in_flight.len() < max_in_flight && !frontier.is_empty() {
                if let Some(reason) = interruption(cancel, run_deadline, budget_deadline) {
                    stop = Some(reason);
                    break;
                }
                if admitted >= domain.page_budget {
                    stop = Some(StopReason::PageBudget);
                    break;
                }
                let Some(visit) = frontier.pop_front() else {
                    break;
                };
                admitted += 1;
                in_flight.push(fetch_paced(fetcher, &pacer, visit, fetch_deadline, cancel));
            }

            let Some((visit, result)) = in_flight.next().await else {
                break;
            };
            let Some(result) = result else {
                // Deadline or cancellation fired before the fetch started
                stop = stop.or_else(|| interruption(cancel, run_deadline, budget_deadline));
                continue;
            };
            pages_fetched += 1;

            let evaluation = self.evaluate(domain, &root, &visit, result, &mut external_seen);
            findings.extend(evaluation.findings);

            if let Some((target, chain)) = evaluation.redirect {
                if visited.insert(normalize(&target)) {
                    frontier.push_front(Visit {
                        url: target,
                        depth: visit.depth,
                        chain,
                    });
                }
            }

            let depth = visit.depth + 1;
            for link in evaluation.links {
                let key = normalize(&link);
                if depth > domain.depth_budget {
                    depth_limited |= !visited.contains(&key);
                } else if visited.insert(key) {
                    frontier.push_back(Visit::new(link, depth));
                }
            }
        }

        let stop_reason = stop.unwrap_or(if depth_limited {
            StopReason::DepthBudget
        } else {
            StopReason::FrontierExhausted
        });

        info!(
            domain = %domain.hostname,
            pages = pages_fetched,
            findings = findings.len(),
            stop_reason = %stop_reason,
            "crawl finished"
        );

        Ok(CrawlOutcome {
            findings,
            pages_fetched,
            stop_reason,
        })
    }

    /// Turn one fetch result into findings and follow-ups.
    pub(crate) fn evaluate(
        &self,
        domain: &DomainConfig,
        root: &Url,
        visit: &Visit,
        result: vigil_browser::Result<FetchedPage>,
        external_seen: &mut HashSet<String>,
    ) -> Evaluation {
        let mut evaluation = Evaluation::default();

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %visit.url, "fetch failed: {}", e);
                evaluation
                    .findings
                    .push(rules::fetch_failed(&visit.url, &e.to_string()));
                return evaluation;
            }
        };

        if let Some(target) = page.location().filter(|_| page.is_redirect()) {
            let mut chain = visit.chain.clone();
            chain.push(visit.url.clone());
            let start = chain[0].clone();

            if !same_origin(root, &target) {
                evaluation
                    .findings
                    .push(rules::external_redirect(&start, &target));
            } else if chain.len() > MAX_REDIRECT_HOPS {
                chain.push(target);
                evaluation.findings.push(rules::redirect_chain_too_long(
                    &start,
                    &chain,
                    MAX_REDIRECT_HOPS,
                ));
            } else {
                debug!(from = %visit.url, to = %target, "following redirect");
                evaluation.redirect = Some((target, chain));
            }
            return evaluation;
        }

        if !page.is_success() {
            evaluation
                .findings
                .push(rules::http_status(&page.url, page.status));
            return evaluation;
        }

        evaluation.findings = self.checks.inspect(&page, domain);
        evaluation.inspected = true;

        for link in &page.links {
            if same_origin(root, link) {
                evaluation.links.push(link.clone());
            } else if self.report_external_links && external_seen.insert(normalize(link)) {
                evaluation
                    .findings
                    .push(rules::external_link(&page.url, link));
            }
        }

        evaluation
    }

    /// Fetch one URL, following same-origin redirects, and evaluate it.
    pub(crate) async fn probe(
        &self,
        domain: &DomainConfig,
        root: &Url,
        url: Url,
        fetcher: &dyn PageFetcher,
        pacer: &RatePacer,
    ) -> Probe {
        let mut visit = Visit::new(url, 0);
        let mut external_seen = HashSet::new();
        let mut findings = Vec::new();

        loop {
            pacer.acquire().await;
            let result = fetcher.fetch(&visit.url).await;
            let responded = result.is_ok();
            let evaluation = self.evaluate(domain, root, &visit, result, &mut external_seen);
            findings.extend(evaluation.findings);

            match evaluation.redirect {
                Some((url, chain)) => {
                    visit = Visit {
                        url,
                        depth: 0,
                        chain,
                    };
                }
                None => {
                    return Probe {
                        findings,
                        responded,
                        inspected: evaluation.inspected,
                    }
                }
            }
        }
    }
}

fn interruption(
    cancel: &CancellationToken,
    run_deadline: Option<Instant>,
    budget_deadline: Instant,
) -> Option<StopReason> {
    let now = Instant::now();
    if cancel.is_cancelled() {
        Some(StopReason::Cancelled)
    } else if run_deadline.is_some_and(|d| now >= d) {
        Some(StopReason::Deadline)
    } else if now >= budget_deadline {
        Some(StopReason::RuntimeBudget)
    } else {
        None
    }
}

async fn fetch_paced(
    fetcher: &dyn PageFetcher,
    pacer: &RatePacer,
    visit: Visit,
    deadline: Instant,
    cancel: &CancellationToken,
) -> (Visit, Option<vigil_browser::Result<FetchedPage>>) {
    tokio::select! {
        biased;
        () = cancel.cancelled() => return (visit, None),
        () = sleep_until(deadline) => return (visit, None),
        () = pacer.acquire() => {}
    }
    if cancel.is_cancelled() || Instant::now() >= deadline {
        return (visit, None);
    }

    debug!(url = %visit.url, depth = visit.depth, "fetching");
    let result = fetcher.fetch(&visit.url).await;
    (visit, Some(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_browser::BrowserError;
    use vigil_core::DomainId;

    fn domain() -> DomainConfig {
        DomainConfig::new(DomainId::new("example.com").unwrap())
    }

    fn root() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    fn engine() -> CrawlEngine {
        CrawlEngine::new(ResolvedChecks::default()).report_external_links(true)
    }

    #[test]
    fn test_fetch_error_becomes_finding() {
        let visit = Visit::new(root(), 0);
        let evaluation = engine().evaluate(
            &domain(),
            &root(),
            &visit,
            Err(BrowserError::Timeout("30s".to_string())),
            &mut HashSet::new(),
        );
        assert_eq!(evaluation.findings.len(), 1);
        assert_eq!(evaluation.findings[0].rule_id, "crawl.fetch_failed");
        assert!(!evaluation.inspected);
    }

    #[test]
    fn test_error_status_becomes_finding() {
        let url = root().join("/gone").unwrap();
        let evaluation = engine().evaluate(
            &domain(),
            &root(),
            &Visit::new(url.clone(), 1),
            Ok(FetchedPage::new(url, 410)),
            &mut HashSet::new(),
        );
        assert_eq!(evaluation.findings.len(), 1);
        assert_eq!(evaluation.findings[0].rule_id, "crawl.http_status");
        assert_eq!(evaluation.findings[0].metric, Some(410.0));
    }

    #[test]
    fn test_links_split_by_origin() {
        let page = FetchedPage::html(
            root(),
            200,
            r#"<a href="/a">a</a><a href="https://other.org/x">x</a><a href="https://other.org/x#top">x</a>"#,
        );
        let mut seen = HashSet::new();
        let evaluation = engine().evaluate(&domain(), &root(), &Visit::new(root(), 0), Ok(page), &mut seen);

        assert_eq!(evaluation.links, vec![root().join("/a").unwrap()]);
        assert_eq!(evaluation.findings.len(), 1);
        assert_eq!(evaluation.findings[0].rule_id, "links.external_link");
        assert!(evaluation.inspected);

        let quiet = CrawlEngine::new(ResolvedChecks::default()).evaluate(
            &domain(),
            &root(),
            &Visit::new(root(), 0),
            Ok(FetchedPage::html(root(), 200, r#"<a href="https://other.org/">x</a>"#)),
            &mut HashSet::new(),
        );
        assert!(quiet.findings.is_empty());
    }

    #[test]
    fn test_redirect_hop_limit() {
        let hop = |n: usize| root().join(&format!("/r{n}")).unwrap();
        let visit = Visit {
            url: hop(3),
            depth: 0,
            chain: vec![hop(0), hop(1), hop(2)],
        };
        let evaluation = engine().evaluate(
            &domain(),
            &root(),
            &visit,
            Ok(FetchedPage::redirect(hop(3), 301, "/r4")),
            &mut HashSet::new(),
        );
        assert!(evaluation.redirect.is_none());
        assert_eq!(evaluation.findings.len(), 1);
        assert_eq!(evaluation.findings[0].rule_id, "crawl.redirect_chain_too_long");
        assert_eq!(evaluation.findings[0].route, "/r0");
    }

    #[test]
    fn test_probe_settles_by_rule_kind() {
        let error_page = Probe {
            findings: Vec::new(),
            responded: true,
            inspected: false,
        };
        assert!(error_page.settles("crawl.http_status"));
        assert!(error_page.settles("crawl.fetch_failed"));
        assert!(!error_page.settles("links.insecure_link"));
        assert!(!error_page.settles("links.external_link"));

        let unreachable = Probe {
            responded: false,
            ..error_page
        };
        assert!(unreachable.settles("crawl.fetch_failed"));
        assert!(!unreachable.settles("crawl.http_status"));
        assert!(!unreachable.settles("crawl.redirect_chain_too_long"));
    }

    #[test]
    fn test_interruption_priority() {
        let cancel = CancellationToken::new();
        let past = Instant::now();
        let future = past + std::time::Duration::from_secs(60);

        assert_eq!(interruption(&cancel, None, future), None);
        assert_eq!(
            interruption(&cancel, None, past),
            Some(StopReason::RuntimeBudget)
        );
        assert_eq!(
            interruption(&cancel, Some(past), past),
            Some(StopReason::Deadline)
        );
        cancel.cancel();
        assert_eq!(
            interruption(&cancel, Some(past), past),
            Some(StopReason::Cancelled)
        );
    }
}
