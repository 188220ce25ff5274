use crate::error::Result;
use crate::finding::{Finding, FindingDetail, RuleScope};
use crate::module::CheckModule;
use crate::rules::RuleSpec;
use vigil_browser::FetchedPage;
use vigil_core::{Category, DomainConfig, Severity};

const INVALID_JSON: RuleSpec = RuleSpec {
    id: "api.invalid_json",
    title: "JSON response does not parse",
    scope: RuleScope::Route,
    auto_fixable: false,
    severity_hint: Severity::High,
};

static RULES: &[RuleSpec] = &[INVALID_JSON];

/// Responses declaring a JSON media type must carry valid JSON.
pub struct ApiContractCheck;

fn is_json(content_type: &str) -> bool {
    content_type == "application/json" || content_type.ends_with("+json")
}

impl CheckModule for ApiContractCheck {
    fn name(&self) -> &'static str {
        "api_contract"
    }

    fn category(&self) -> Category {
        Category::ApiContract
    }

    fn rules(&self) -> &'static [RuleSpec] {
        RULES
    }

    fn inspect(&self, page: &FetchedPage, _domain: &DomainConfig) -> Result<Vec<Finding>> {
        let Some(content_type) = page.content_type().filter(|ct| is_json(ct)) else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<serde_json::Value>(&page.body) {
            Ok(_) => Ok(Vec::new()),
            Err(e) => Ok(vec![Finding::from_rule(
                &INVALID_JSON,
                &page.url,
                format!("{} declares {content_type} but the body is not JSON: {e}", page.route()),
                FindingDetail::ApiContract {
                    expected: content_type,
                    observed: e.to_string(),
                },
            )
            .with_evidence([page.body.chars().take(120).collect::<String>()])]),
        }
    }
}
