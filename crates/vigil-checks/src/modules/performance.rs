use crate::error::Result;
use crate::finding::{Finding, FindingDetail, RuleScope};
use crate::module::CheckModule;
use crate::rules::RuleSpec;
use vigil_browser::FetchedPage;
use vigil_core::{Category, DomainConfig, Severity};

const RESPONSE_TIME: RuleSpec = RuleSpec {
    id: "perf.response_time_ms",
    title: "Slow response",
    scope: RuleScope::Route,
    auto_fixable: false,
    severity_hint: Severity::Medium,
};

const PAGE_WEIGHT: RuleSpec = RuleSpec {
    id: "perf.page_weight_bytes",
    title: "Heavy page",
    scope: RuleScope::Route,
    auto_fixable: false,
    severity_hint: Severity::Medium,
};

const RUNTIME_ERRORS: RuleSpec = RuleSpec {
    id: "perf.runtime_errors",
    title: "Page raised script errors while rendering",
    scope: RuleScope::Route,
    auto_fixable: false,
    severity_hint: Severity::Medium,
};

static RULES: &[RuleSpec] = &[RESPONSE_TIME, PAGE_WEIGHT, RUNTIME_ERRORS];

/// Response time, page weight and render-time errors.
///
/// Budgets decide when a finding is reported at all; its severity comes
/// from the metric bands of the severity table.
#[derive(Debug, Clone, Copy)]
pub struct PerformanceCheck {
    /// Report responses slower than this (milliseconds)
    pub response_time_budget_ms: f64,
    /// Report bodies heavier than this (bytes)
    pub page_weight_budget_bytes: f64,
}

impl Default for PerformanceCheck {
    fn default() -> Self {
        Self {
            response_time_budget_ms: 1000.0,
            page_weight_budget_bytes: 2.0 * 1024.0 * 1024.0,
        }
    }
}

impl CheckModule for PerformanceCheck {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn category(&self) -> Category {
        Category::Performance
    }

    fn rules(&self) -> &'static [RuleSpec] {
        RULES
    }

    fn inspect(&self, page: &FetchedPage, _domain: &DomainConfig) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        let route = page.route();

        let elapsed_ms = page.elapsed.as_secs_f64() * 1000.0;
        if elapsed_ms >= self.response_time_budget_ms {
            findings.push(
                Finding::from_rule(
                    &RESPONSE_TIME,
                    &page.url,
                    format!("{route} took {elapsed_ms:.0} ms"),
                    FindingDetail::Performance {
                        metric: "response_time_ms".to_string(),
                        value: elapsed_ms,
                        budget: self.response_time_budget_ms,
                    },
                )
                .with_metric(elapsed_ms),
            );
        }

        #[allow(clippy::cast_precision_loss)]
        let weight = page.body_bytes as f64;
        if weight >= self.page_weight_budget_bytes {
            findings.push(
                Finding::from_rule(
                    &PAGE_WEIGHT,
                    &page.url,
                    format!("{route} weighs {} bytes", page.body_bytes),
                    FindingDetail::Performance {
                        metric: "page_weight_bytes".to_string(),
                        value: weight,
                        budget: self.page_weight_budget_bytes,
                    },
                )
                .with_metric(weight),
            );
        }

        if !page.runtime_errors.is_empty() {
            #[allow(clippy::cast_precision_loss)]
            let count = page.runtime_errors.len() as f64;
            findings.push(
                Finding::from_rule(
                    &RUNTIME_ERRORS,
                    &page.url,
                    format!(
                        "{} error(s) while rendering {route}",
                        page.runtime_errors.len()
                    ),
                    FindingDetail::Performance {
                        metric: "runtime_errors".to_string(),
                        value: count,
                        budget: 0.0,
                    },
                )
                .with_evidence(page.runtime_errors.iter().cloned()),
            );
        }

        Ok(findings)
    }
}
