//! Rule declarations.
//!
//! Each module declares the rules it can emit; the engines emit a few
//! crawl-level rules of their own (fetch failures, redirects, external
//! links, module failures), declared here with their constructors.

use crate::finding::{Finding, FindingDetail, RuleScope};
use url::Url;
use vigil_core::{Category, Severity};

/// Static description of one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSpec {
    /// Rule identifier, `<area>.<name>`
    pub id: &'static str,
    /// Short human title
    pub title: &'static str,
    /// Identity scope
    pub scope: RuleScope,
    /// Whether remediation can be applied mechanically
    pub auto_fixable: bool,
    /// Fallback severity when no rule table entry applies
    pub severity_hint: Severity,
}

/// Fetch error (DNS, TLS, timeout, connection reset).
pub const FETCH_FAILED: RuleSpec = RuleSpec {
    id: "crawl.fetch_failed",
    title: "Page could not be fetched",
    scope: RuleScope::Route,
    auto_fixable: false,
    severity_hint: Severity::High,
};

/// 4xx/5xx response; classified by status bands.
pub const HTTP_STATUS: RuleSpec = RuleSpec {
    id: "crawl.http_status",
    title: "Page answered with an error status",
    scope: RuleScope::Route,
    auto_fixable: false,
    severity_hint: Severity::High,
};

/// More redirect hops than allowed.
pub const REDIRECT_CHAIN_TOO_LONG: RuleSpec = RuleSpec {
    id: "crawl.redirect_chain_too_long",
    title: "Redirect chain too long",
    scope: RuleScope::Route,
    auto_fixable: true,
    severity_hint: Severity::Medium,
};

/// Redirect leaving the audited origin.
pub const EXTERNAL_REDIRECT: RuleSpec = RuleSpec {
    id: "crawl.external_redirect",
    title: "Page redirects off the domain",
    scope: RuleScope::Route,
    auto_fixable: false,
    severity_hint: Severity::Low,
};

/// Outbound link to another origin.
pub const EXTERNAL_LINK: RuleSpec = RuleSpec {
    id: "links.external_link",
    title: "External link",
    scope: RuleScope::Site,
    auto_fixable: false,
    severity_hint: Severity::Low,
};

/// A check module errored or panicked.
pub const MODULE_FAILED: RuleSpec = RuleSpec {
    id: "check.module_failed",
    title: "Check module failed",
    scope: RuleScope::Route,
    auto_fixable: false,
    severity_hint: Severity::Low,
};

/// Rules decided by the fetch itself rather than by a check module.
pub const FETCH_OUTCOME_RULES: [&RuleSpec; 4] = [
    &FETCH_FAILED,
    &HTTP_STATUS,
    &REDIRECT_CHAIN_TOO_LONG,
    &EXTERNAL_REDIRECT,
];

/// Whether `rule_id` is one of [`FETCH_OUTCOME_RULES`].
#[must_use]
pub fn is_fetch_outcome(rule_id: &str) -> bool {
    FETCH_OUTCOME_RULES.iter().any(|rule| rule.id == rule_id)
}

/// The page could not be fetched at all.
#[must_use]
pub fn fetch_failed(url: &Url, error: &str) -> Finding {
    Finding::from_rule(
        &FETCH_FAILED,
        url,
        format!("Fetching {url} failed: {error}"),
        FindingDetail::FetchFailure {
            error: error.to_string(),
            status: None,
        },
    )
}

/// The page answered with a non-2xx/3xx status.
#[must_use]
pub fn http_status(url: &Url, status: u16) -> Finding {
    Finding::from_rule(
        &HTTP_STATUS,
        url,
        format!("{url} answered with HTTP {status}"),
        FindingDetail::FetchFailure {
            error: format!("HTTP {status}"),
            status: Some(status),
        },
    )
    .with_metric(f64::from(status))
    .with_evidence([format!("HTTP {status}")])
}

/// Following redirects from `start` needed more than the allowed hops.
#[must_use]
pub fn redirect_chain_too_long(start: &Url, chain: &[Url], max_hops: usize) -> Finding {
    let chain: Vec<String> = chain.iter().map(ToString::to_string).collect();
    Finding::from_rule(
        &REDIRECT_CHAIN_TOO_LONG,
        start,
        format!("{start} redirects more than {max_hops} times"),
        FindingDetail::Redirect {
            chain: chain.clone(),
        },
    )
    .with_evidence(chain)
}

/// A redirect from `start` ends on another origin.
#[must_use]
pub fn external_redirect(start: &Url, target: &Url) -> Finding {
    Finding::from_rule(
        &EXTERNAL_REDIRECT,
        start,
        format!("{start} redirects to {target}"),
        FindingDetail::Redirect {
            chain: vec![start.to_string(), target.to_string()],
        },
    )
    .with_signature(target.as_str())
    .with_evidence([target.to_string()])
}

/// A link on `page` targets another origin.
#[must_use]
pub fn external_link(page: &Url, target: &Url) -> Finding {
    Finding::from_rule(
        &EXTERNAL_LINK,
        page,
        format!("{page} links to external {target}"),
        FindingDetail::Link {
            targets: vec![target.to_string()],
        },
    )
    .with_signature(target.as_str())
    .with_evidence([target.to_string()])
}

/// A module errored or panicked on `page`.
#[must_use]
pub fn module_failed(page: &Url, module: &str, category: Category, error: &str) -> Finding {
    Finding::from_rule(
        &MODULE_FAILED,
        page,
        format!("Check module {module} failed on {page}: {error}"),
        FindingDetail::ModuleFailure {
            module: module.to_string(),
            category,
            error: error.to_string(),
        },
    )
    .with_signature(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_http_status_carries_metric() {
        let finding = http_status(&url("https://example.com/missing"), 404);
        assert_eq!(finding.rule_id, "crawl.http_status");
        assert_eq!(finding.metric, Some(404.0));
        assert_eq!(finding.route, "/missing");
        assert_eq!(finding.category(), Category::LinkIntegrity);
    }

    #[test]
    fn test_fetch_outcome_rules() {
        assert!(is_fetch_outcome("crawl.http_status"));
        assert!(is_fetch_outcome("crawl.redirect_chain_too_long"));
        assert!(!is_fetch_outcome("links.external_link"));
        assert!(!is_fetch_outcome("links.insecure_link"));
        assert!(!is_fetch_outcome("check.module_failed"));
    }

    #[test]
    fn test_external_link_is_site_scoped() {
        let finding = external_link(
            &url("https://example.com/a"),
            &url("https://other.org/"),
        );
        assert_eq!(finding.identity_route(), None);
        assert_eq!(finding.signature.as_deref(), Some("https://other.org/"));
    }

    #[test]
    fn test_module_failure_keeps_module_category() {
        let finding = module_failed(
            &url("https://example.com/"),
            "seo",
            Category::Seo,
            "boom",
        );
        assert_eq!(finding.category(), Category::Seo);
        assert_eq!(finding.identity_route(), Some("/"));
    }
}
