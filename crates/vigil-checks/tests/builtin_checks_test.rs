use std::time::Duration;
use url::Url;
use vigil_browser::FetchedPage;
use vigil_checks::{CheckRegistry, RuleScope};
use vigil_core::{Category, DomainConfig, DomainId};

const NEGLECTED_PAGE: &str = r#"<!doctype html>
<html>
  <head><title>Index of /backup</title></head>
  <body>
    <h1>Index of /backup</h1>
    <img src="/logo.png">
    <a href="">broken</a>
    <a href="http://example.com/plain">plain</a>
    <a href="https://other.org/">elsewhere</a>
  </body>
</html>"#;

fn domain() -> DomainConfig {
    DomainConfig::new(DomainId::new("example.com").expect("valid hostname"))
}

fn neglected_page() -> FetchedPage {
    FetchedPage::html(
        Url::parse("https://example.com/backup/").expect("valid url"),
        200,
        NEGLECTED_PAGE,
    )
    .with_elapsed(Duration::from_millis(1500))
}

#[test]
fn test_every_finding_belongs_to_its_module() {
    let registry = CheckRegistry::with_builtin();
    let page = neglected_page();

    for category in Category::ALL {
        for module in registry.get_by_category(category) {
            let findings = module.inspect(&page, &domain()).expect("module succeeds");
            for finding in findings {
                assert_eq!(finding.category(), category, "{}", finding.rule_id);
                let declared = module.rules().iter().find(|r| r.id == finding.rule_id);
                let rule = declared.unwrap_or_else(|| {
                    panic!("{} emitted undeclared {}", module.name(), finding.rule_id)
                });
                assert_eq!(rule.scope, finding.scope);
            }
        }
    }
}

#[test]
fn test_full_run_over_neglected_page() {
    let checks = CheckRegistry::with_builtin().resolve(&Category::ALL);
    let findings = checks.inspect(&neglected_page(), &domain());
    let rules: Vec<&str> = findings.iter().map(|f| f.rule_id.as_str()).collect();

    for expected in [
        "links.empty_href",
        "links.insecure_link",
        "seo.meta_description_missing",
        "seo.canonical_missing",
        "security.hsts_missing",
        "perf.response_time_ms",
        "a11y.img_missing_alt",
        "a11y.html_lang_missing",
        "access.directory_listing",
    ] {
        assert!(rules.contains(&expected), "missing {expected} in {rules:?}");
    }

    // Title and h1 are present, if unhelpful
    assert!(!rules.contains(&"seo.title_missing"));
    assert!(!rules.contains(&"check.module_failed"));

    let site_scoped = findings
        .iter()
        .filter(|f| f.scope == RuleScope::Site)
        .count();
    assert_eq!(site_scoped, 5);
}

#[test]
fn test_category_subset_only_runs_those_modules() {
    let checks = CheckRegistry::with_builtin().resolve(&[Category::AccessControl]);
    let findings = checks.inspect(&neglected_page(), &domain());
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule_id, "access.directory_listing");
}
