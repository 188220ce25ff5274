use crate::error::Result;
use crate::finding::{Finding, FindingDetail, RuleScope};
use crate::html;
use crate::module::CheckModule;
use crate::rules::RuleSpec;
use scraper::Html;
use vigil_browser::FetchedPage;
use vigil_core::{Category, DomainConfig, Severity};

const DIRECTORY_LISTING: RuleSpec = RuleSpec {
    id: "access.directory_listing",
    title: "Directory listing exposed",
    scope: RuleScope::Route,
    auto_fixable: true,
    severity_hint: Severity::Blocker,
};

static RULES: &[RuleSpec] = &[DIRECTORY_LISTING];

/// Detects auto-generated server directory indexes.
pub struct AccessControlCheck;

impl CheckModule for AccessControlCheck {
    fn name(&self) -> &'static str {
        "access_control"
    }

    fn category(&self) -> Category {
        Category::AccessControl
    }

    fn rules(&self) -> &'static [RuleSpec] {
        RULES
    }

    fn inspect(&self, page: &FetchedPage, _domain: &DomainConfig) -> Result<Vec<Finding>> {
        if !page.is_html() {
            return Ok(Vec::new());
        }

        let document = Html::parse_document(&page.body);
        let title = html::first(&document, "title")?.map(html::text).unwrap_or_default();
        let heading = html::first(&document, "h1")?.map(html::text).unwrap_or_default();

        let indicator = if title.starts_with("Index of /") {
            Some(format!("title: {title}"))
        } else if heading.starts_with("Index of /") {
            Some(format!("h1: {heading}"))
        } else if title.starts_with("Directory listing for /") {
            Some(format!("title: {title}"))
        } else {
            None
        };

        Ok(indicator
            .map(|indicator| {
                Finding::from_rule(
                    &DIRECTORY_LISTING,
                    &page.url,
                    format!("{} serves a directory listing", page.route()),
                    FindingDetail::AccessControl {
                        indicator: indicator.clone(),
                    },
                )
                .with_evidence([indicator])
            })
            .into_iter()
            .collect())
    }
}
