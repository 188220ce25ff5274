//! End-to-end audit runs over scripted sites and an in-memory store.

mod common;

use common::{storefront, ScriptedFactory, Site, SHOP};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use vigil_browser::FetchedPage;
use vigil_checks::CheckRegistry;
use vigil_core::{
    AppConfig, Category, DomainConfig, DomainId, DomainStatus, IssueStatus, RunStatus, Severity,
    SeverityCounts, StopReason, Verdict,
};
use vigil_crawler::AuditOrchestrator;
use vigil_issues::{FixPacketGenerator, IssueFilter, IssueStore, MemoryStore, RunStore, TrendStore};

fn shop() -> DomainId {
    DomainId::new("shop.example.com").expect("valid hostname")
}

fn config(domains: Vec<DomainConfig>) -> AppConfig {
    let mut config = AppConfig::default();
    config.domains = domains;
    config
}

fn shop_config() -> DomainConfig {
    let mut domain = DomainConfig::new(shop());
    domain.page_budget = 1;
    domain.requests_per_second = 1000.0;
    domain
}

fn orchestrator(
    factory: ScriptedFactory,
    store: &Arc<MemoryStore>,
    config: AppConfig,
) -> AuditOrchestrator {
    let store: Arc<MemoryStore> = Arc::clone(store);
    AuditOrchestrator::new(
        Arc::new(CheckRegistry::with_builtin()),
        Arc::new(factory),
        store,
        config,
    )
}

#[tokio::test]
async fn test_run_end_to_end() {
    let site = Site::new();
    site.respond(SHOP, storefront(false, false));
    let store = Arc::new(MemoryStore::new());
    let orchestrator = orchestrator(
        ScriptedFactory::new(Arc::clone(&site)),
        &store,
        config(vec![shop_config()]),
    );

    let report = orchestrator.run(&CancellationToken::new()).await;

    assert_eq!(report.run.status, RunStatus::Complete);
    assert_eq!(report.run.counts, SeverityCounts::new(1, 1, 0, 0));
    assert_eq!(report.run.verdict, Some(Verdict::Red));
    assert!(report.run.ended_at.is_some());
    assert!(!report.run.deadline_hit);
    assert_eq!(report.run.store_errors, 0);

    assert_eq!(report.domains.len(), 1);
    let summary = &report.domains[0];
    assert_eq!(summary.status, DomainStatus::Complete);
    assert_eq!(summary.stop_reason, Some(StopReason::FrontierExhausted));
    assert_eq!(summary.pages_fetched, 1);
    assert_eq!(summary.findings, 2);

    let issues = store.list_issues(&IssueFilter::all()).await.expect("list");
    let mut rules: Vec<_> = issues.iter().map(|i| i.rule_id.as_str()).collect();
    rules.sort_unstable();
    assert_eq!(rules, vec!["security.hsts_missing", "seo.title_missing"]);
    assert!(issues.iter().all(|i| i.status == IssueStatus::Open));
    assert!(issues.iter().all(|i| i.first_seen_run == report.run.id));

    let stored = store.get_run(&report.run.id).await.expect("get run");
    assert_eq!(stored, Some(report.run.clone()));
    let domain_runs = store.list_domain_runs(&report.run.id).await.expect("list");
    assert_eq!(domain_runs, report.domains);

    let trends = store.list_trends(&shop()).await.expect("trends");
    assert_eq!(trends.len(), Category::ALL.len());
    let seo = trends
        .iter()
        .find(|r| r.category == Category::Seo)
        .expect("seo row");
    assert_eq!(seo.counts.blocker, 1);
    assert_eq!(seo.score, 75);
}

#[tokio::test]
async fn test_recurring_defect_keeps_one_issue() {
    let site = Site::new();
    site.respond(SHOP, storefront(false, false));
    let store = Arc::new(MemoryStore::new());
    let orchestrator = orchestrator(
        ScriptedFactory::new(Arc::clone(&site)),
        &store,
        config(vec![shop_config()]),
    );

    let first = orchestrator.run(&CancellationToken::new()).await;
    site.respond(SHOP, storefront(true, false));
    let second = orchestrator.run(&CancellationToken::new()).await;

    assert_eq!(second.run.counts, SeverityCounts::new(0, 1, 0, 0));
    assert_eq!(second.run.verdict, Some(Verdict::Green));

    let issues = store.list_issues(&IssueFilter::all()).await.expect("list");
    assert_eq!(issues.len(), 2);
    let hsts = issues
        .iter()
        .find(|i| i.rule_id == "security.hsts_missing")
        .expect("hsts issue");
    assert_eq!(hsts.occurrence_count, 2);
    assert_eq!(hsts.first_seen_run, first.run.id);
    assert_eq!(hsts.last_seen_run, second.run.id);

    let title = issues
        .iter()
        .find(|i| i.rule_id == "seo.title_missing")
        .expect("title issue");
    assert_eq!(title.occurrence_count, 1);
    assert_eq!(title.last_seen_run, first.run.id);
}

#[tokio::test]
async fn test_fix_packet_for_run() {
    let site = Site::new();
    site.respond(SHOP, storefront(false, false));
    let store = Arc::new(MemoryStore::new());
    let orchestrator = orchestrator(
        ScriptedFactory::new(Arc::clone(&site)),
        &store,
        config(vec![shop_config()]),
    );

    let report = orchestrator.run(&CancellationToken::new()).await;
    let packet = orchestrator
        .fix_packet(&report.run.id, FixPacketGenerator::new())
        .await
        .expect("fix packet");

    assert_eq!(packet.run_id, report.run.id);
    assert_eq!(packet.issues.len(), 2);
    assert_eq!(packet.issues[0].severity, Severity::Blocker);
    assert_eq!(packet.issues[0].rule_id, "seo.title_missing");
    assert_eq!(packet.summary.blocker, 1);
    assert_eq!(packet.summary.high, 1);

    let blockers_only = orchestrator
        .fix_packet(&report.run.id, FixPacketGenerator::new().min_severity(Severity::Blocker))
        .await
        .expect("fix packet");
    assert_eq!(blockers_only.issues.len(), 1);
}

#[tokio::test]
async fn test_domains_run_in_tier_order() {
    let site = Site::new();
    let mut domains = Vec::new();
    for (host, tier) in [("c.example.com", 2), ("b.example.com", 1), ("a.example.com", 2)] {
        let root = format!("https://{host}/");
        site.respond(
            &root,
            FetchedPage::html(Url::parse(&root).expect("valid url"), 200, "<p>ok</p>"),
        );
        let mut domain = DomainConfig::new(DomainId::new(host).expect("valid hostname"));
        domain.tier = tier;
        domains.push(domain);
    }
    let mut disabled = DomainConfig::new(DomainId::new("off.example.com").expect("valid hostname"));
    disabled.enabled = false;
    domains.push(disabled);

    let mut config = config(domains);
    config.run.worker_pool = 1;
    let store = Arc::new(MemoryStore::new());
    let orchestrator = orchestrator(ScriptedFactory::new(Arc::clone(&site)), &store, config);

    let report = orchestrator.run(&CancellationToken::new()).await;

    let order: Vec<_> = report.domains.iter().map(|d| d.domain.as_str()).collect();
    assert_eq!(order, vec!["b.example.com", "a.example.com", "c.example.com"]);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_skips_remaining_domains() {
    let site = Site::new();
    site.set_latency(Duration::from_secs(2));
    site.respond(
        "https://a.example.com/",
        FetchedPage::html(
            Url::parse("https://a.example.com/").expect("valid url"),
            200,
            r#"<a href="/next">next</a>"#,
        ),
    );

    let mut first = DomainConfig::new(DomainId::new("a.example.com").expect("valid hostname"));
    first.tier = 1;
    let mut second = DomainConfig::new(DomainId::new("b.example.com").expect("valid hostname"));
    second.tier = 2;

    let mut config = config(vec![first, second]);
    config.run.worker_pool = 1;
    config.run.max_runtime_secs = 1;
    let store = Arc::new(MemoryStore::new());
    let orchestrator = orchestrator(ScriptedFactory::new(Arc::clone(&site)), &store, config);

    let report = orchestrator.run(&CancellationToken::new()).await;

    assert!(report.run.deadline_hit);
    assert_eq!(report.run.status, RunStatus::Complete);
    assert_eq!(report.domains.len(), 2);

    assert_eq!(report.domains[0].status, DomainStatus::Partial);
    assert_eq!(report.domains[0].stop_reason, Some(StopReason::Deadline));
    assert_eq!(report.domains[1].status, DomainStatus::Skipped);
    assert_eq!(report.domains[1].stop_reason, Some(StopReason::Deadline));
    assert_eq!(site.fetch_count(), 1);
}

#[tokio::test]
async fn test_cancelled_run_starts_nothing() {
    let site = Site::new();
    site.respond(SHOP, storefront(false, false));
    let store = Arc::new(MemoryStore::new());
    let orchestrator = orchestrator(
        ScriptedFactory::new(Arc::clone(&site)),
        &store,
        config(vec![shop_config()]),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = orchestrator.run(&cancel).await;

    assert_eq!(report.run.status, RunStatus::Cancelled);
    assert_eq!(report.domains[0].status, DomainStatus::Skipped);
    assert_eq!(report.domains[0].stop_reason, Some(StopReason::Cancelled));
    assert_eq!(report.run.counts, SeverityCounts::default());
    assert_eq!(site.fetch_count(), 0);
}

#[tokio::test]
async fn test_unavailable_fetcher_fails_run() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = orchestrator(
        ScriptedFactory::failing(Site::new()),
        &store,
        config(vec![shop_config()]),
    );

    let report = orchestrator.run(&CancellationToken::new()).await;

    assert_eq!(report.run.status, RunStatus::Failed);
    assert_eq!(report.domains[0].status, DomainStatus::Failed);
    assert!(report.domains[0]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("browser failed to launch")));
    assert_eq!(report.run.verdict, Some(Verdict::Green));
}

#[tokio::test]
async fn test_store_failures_do_not_abort_run() {
    let site = Site::new();
    site.respond(SHOP, storefront(false, false));
    let store = Arc::new(MemoryStore::new());
    store.set_fail_writes(true);
    let orchestrator = orchestrator(
        ScriptedFactory::new(Arc::clone(&site)),
        &store,
        config(vec![shop_config()]),
    );

    let report = orchestrator.run(&CancellationToken::new()).await;

    assert_eq!(report.run.status, RunStatus::Complete);
    assert_eq!(report.run.counts, SeverityCounts::new(1, 1, 0, 0));
    assert_eq!(report.run.verdict, Some(Verdict::Red));
    // run start, two issues, trends, domain outcome, run end
    assert_eq!(report.run.store_errors, 6);
    assert!(store
        .list_issues(&IssueFilter::all())
        .await
        .expect("list")
        .is_empty());
}
