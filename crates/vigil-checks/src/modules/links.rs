use crate::error::Result;
use crate::finding::{Finding, FindingDetail, RuleScope};
use crate::html;
use crate::module::CheckModule;
use crate::rules::RuleSpec;
use scraper::Html;
use vigil_browser::{resolve_href, FetchedPage};
use vigil_core::{Category, DomainConfig, Severity};

const EMPTY_HREF: RuleSpec = RuleSpec {
    id: "links.empty_href",
    title: "Link without a target",
    scope: RuleScope::Route,
    auto_fixable: true,
    severity_hint: Severity::Low,
};

const INSECURE_LINK: RuleSpec = RuleSpec {
    id: "links.insecure_link",
    title: "Insecure link on a secure page",
    scope: RuleScope::Route,
    auto_fixable: true,
    severity_hint: Severity::Medium,
};

static RULES: &[RuleSpec] = &[EMPTY_HREF, INSECURE_LINK];

/// Anchor hygiene on HTML pages.
///
/// Broken targets are found by the crawl itself (`crawl.http_status`,
/// `crawl.fetch_failed`); this module only looks at the markup.
pub struct LinkIntegrityCheck;

impl CheckModule for LinkIntegrityCheck {
    fn name(&self) -> &'static str {
        "links"
    }

    fn category(&self) -> Category {
        Category::LinkIntegrity
    }

    fn rules(&self) -> &'static [RuleSpec] {
        RULES
    }

    fn inspect(&self, page: &FetchedPage, _domain: &DomainConfig) -> Result<Vec<Finding>> {
        if !page.is_html() {
            return Ok(Vec::new());
        }

        let document = Html::parse_document(&page.body);
        let anchors = html::selector("a")?;

        let mut empty = Vec::new();
        let mut insecure = Vec::new();

        for anchor in document.select(&anchors) {
            match anchor.value().attr("href").map(str::trim) {
                None | Some("" | "#") => empty.push(html::snippet(anchor)),
                Some(href) if page.url.scheme() == "https" => {
                    if let Some(target) = resolve_href(&page.url, href) {
                        if target.scheme() == "http" {
                            insecure.push(target.to_string());
                        }
                    }
                }
                Some(_) => {}
            }
        }

        let mut findings = Vec::new();

        if !empty.is_empty() {
            findings.push(
                Finding::from_rule(
                    &EMPTY_HREF,
                    &page.url,
                    format!("{} link(s) on {} have no target", empty.len(), page.route()),
                    FindingDetail::Link { targets: Vec::new() },
                )
                .with_evidence(empty),
            );
        }

        if !insecure.is_empty() {
            insecure.dedup();
            findings.push(
                Finding::from_rule(
                    &INSECURE_LINK,
                    &page.url,
                    format!(
                        "{} link(s) on {} use plain http",
                        insecure.len(),
                        page.route()
                    ),
                    FindingDetail::Link {
                        targets: insecure.clone(),
                    },
                )
                .with_evidence(insecure),
            );
        }

        Ok(findings)
    }
}
