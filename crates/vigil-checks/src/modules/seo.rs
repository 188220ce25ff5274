use crate::error::Result;
use crate::finding::{Finding, FindingDetail, RuleScope};
use crate::html;
use crate::module::CheckModule;
use crate::rules::RuleSpec;
use scraper::Html;
use vigil_browser::FetchedPage;
use vigil_core::{Category, DomainConfig, Severity};

/// Titles longer than this get truncated in search results.
pub const MAX_TITLE_CHARS: usize = 60;

const TITLE_MISSING: RuleSpec = RuleSpec {
    id: "seo.title_missing",
    title: "Page has no title",
    scope: RuleScope::Route,
    auto_fixable: false,
    severity_hint: Severity::Blocker,
};

const TITLE_TOO_LONG: RuleSpec = RuleSpec {
    id: "seo.title_too_long",
    title: "Page title too long",
    scope: RuleScope::Route,
    auto_fixable: false,
    severity_hint: Severity::Low,
};

const META_DESCRIPTION_MISSING: RuleSpec = RuleSpec {
    id: "seo.meta_description_missing",
    title: "Meta description missing",
    scope: RuleScope::Route,
    auto_fixable: false,
    severity_hint: Severity::Medium,
};

const H1_MISSING: RuleSpec = RuleSpec {
    id: "seo.h1_missing",
    title: "Page has no h1 heading",
    scope: RuleScope::Route,
    auto_fixable: false,
    severity_hint: Severity::Medium,
};

const CANONICAL_MISSING: RuleSpec = RuleSpec {
    id: "seo.canonical_missing",
    title: "Canonical link missing",
    scope: RuleScope::Route,
    auto_fixable: true,
    severity_hint: Severity::Low,
};

static RULES: &[RuleSpec] = &[
    TITLE_MISSING,
    TITLE_TOO_LONG,
    META_DESCRIPTION_MISSING,
    H1_MISSING,
    CANONICAL_MISSING,
];

/// Search-engine metadata on HTML pages.
pub struct SeoCheck;

impl CheckModule for SeoCheck {
    fn name(&self) -> &'static str {
        "seo"
    }

    fn category(&self) -> Category {
        Category::Seo
    }

    fn rules(&self) -> &'static [RuleSpec] {
        RULES
    }

    fn inspect(&self, page: &FetchedPage, _domain: &DomainConfig) -> Result<Vec<Finding>> {
        if !page.is_html() {
            return Ok(Vec::new());
        }

        let document = Html::parse_document(&page.body);
        let route = page.route();
        let mut findings = Vec::new();

        let title = html::first(&document, "head title, title")?
            .map(html::text)
            .filter(|t| !t.is_empty());

        match title {
            None => findings.push(missing(&TITLE_MISSING, page, "title", &route)),
            Some(title) if title.chars().count() > MAX_TITLE_CHARS => {
                let length = title.chars().count();
                findings.push(
                    Finding::from_rule(
                        &TITLE_TOO_LONG,
                        &page.url,
                        format!(
                            "Title on {route} is {length} characters (max {MAX_TITLE_CHARS})"
                        ),
                        FindingDetail::Seo {
                            element: "title".to_string(),
                            observed: Some(title.clone()),
                        },
                    )
                    .with_evidence([title]),
                );
            }
            Some(_) => {}
        }

        let description = html::first(&document, r#"meta[name="description"]"#)?
            .and_then(|m| m.value().attr("content"))
            .map(str::trim)
            .filter(|c| !c.is_empty());
        if description.is_none() {
            findings.push(missing(
                &META_DESCRIPTION_MISSING,
                page,
                r#"meta[name="description"]"#,
                &route,
            ));
        }

        if html::count(&document, "h1")? == 0 {
            findings.push(missing(&H1_MISSING, page, "h1", &route));
        }

        if html::first(&document, r#"link[rel="canonical"][href]"#)?.is_none() {
            findings.push(missing(
                &CANONICAL_MISSING,
                page,
                r#"link[rel="canonical"]"#,
                &route,
            ));
        }

        Ok(findings)
    }
}

fn missing(rule: &RuleSpec, page: &FetchedPage, element: &str, route: &str) -> Finding {
    Finding::from_rule(
        rule,
        &page.url,
        format!("{element} missing on {route}"),
        FindingDetail::Seo {
            element: element.to_string(),
            observed: None,
        },
    )
}
