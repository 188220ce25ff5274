use crate::error::Result;
use crate::finding::{Finding, FindingDetail, RuleScope};
use crate::html;
use crate::module::CheckModule;
use crate::rules::RuleSpec;
use scraper::Html;
use vigil_browser::FetchedPage;
use vigil_core::{Category, DomainConfig, Severity};

const IMG_MISSING_ALT: RuleSpec = RuleSpec {
    id: "a11y.img_missing_alt",
    title: "Images without alternative text",
    scope: RuleScope::Route,
    auto_fixable: false,
    severity_hint: Severity::Medium,
};

const HTML_LANG_MISSING: RuleSpec = RuleSpec {
    id: "a11y.html_lang_missing",
    title: "Document language not declared",
    scope: RuleScope::Route,
    auto_fixable: true,
    severity_hint: Severity::Medium,
};

static RULES: &[RuleSpec] = &[IMG_MISSING_ALT, HTML_LANG_MISSING];

/// Basic accessibility markup. Reported under the performance category.
pub struct AccessibilityCheck;

impl CheckModule for AccessibilityCheck {
    fn name(&self) -> &'static str {
        "accessibility"
    }

    fn category(&self) -> Category {
        Category::Performance
    }

    fn rules(&self) -> &'static [RuleSpec] {
        RULES
    }

    fn inspect(&self, page: &FetchedPage, _domain: &DomainConfig) -> Result<Vec<Finding>> {
        if !page.is_html() {
            return Ok(Vec::new());
        }

        let document = Html::parse_document(&page.body);
        let mut findings = Vec::new();

        let images = html::selector("img:not([alt])")?;
        let offending: Vec<String> = document.select(&images).map(html::snippet).collect();
        if !offending.is_empty() {
            findings.push(
                Finding::from_rule(
                    &IMG_MISSING_ALT,
                    &page.url,
                    format!(
                        "{} image(s) on {} have no alt attribute",
                        offending.len(),
                        page.route()
                    ),
                    FindingDetail::Accessibility {
                        element: "img".to_string(),
                        count: offending.len(),
                    },
                )
                .with_evidence(offending.into_iter().take(5)),
            );
        }

        let lang = html::first(&document, "html")?
            .and_then(|e| e.value().attr("lang"))
            .map(str::trim)
            .filter(|l| !l.is_empty());
        if lang.is_none() {
            findings.push(Finding::from_rule(
                &HTML_LANG_MISSING,
                &page.url,
                format!("<html> on {} has no lang attribute", page.route()),
                FindingDetail::Accessibility {
                    element: "html".to_string(),
                    count: 1,
                },
            ));
        }

        Ok(findings)
    }
}
