use crate::error::Result;
use crate::finding::{Finding, FindingDetail, RuleScope};
use crate::module::CheckModule;
use crate::rules::RuleSpec;
use vigil_browser::FetchedPage;
use vigil_core::{Category, DomainConfig, Severity};

const fn site_rule(id: &'static str, title: &'static str, severity_hint: Severity) -> RuleSpec {
    RuleSpec {
        id,
        title,
        scope: RuleScope::Site,
        auto_fixable: true,
        severity_hint,
    }
}

const HSTS_MISSING: RuleSpec = site_rule(
    "security.hsts_missing",
    "Strict-Transport-Security header missing",
    Severity::High,
);
const CSP_MISSING: RuleSpec = site_rule(
    "security.csp_missing",
    "Content-Security-Policy header missing",
    Severity::High,
);
const CONTENT_TYPE_OPTIONS_MISSING: RuleSpec = site_rule(
    "security.content_type_options_missing",
    "X-Content-Type-Options header missing",
    Severity::Medium,
);
const FRAME_OPTIONS_MISSING: RuleSpec = site_rule(
    "security.frame_options_missing",
    "Clickjacking protection missing",
    Severity::Medium,
);
const REFERRER_POLICY_MISSING: RuleSpec = site_rule(
    "security.referrer_policy_missing",
    "Referrer-Policy header missing",
    Severity::Low,
);

static RULES: &[RuleSpec] = &[
    HSTS_MISSING,
    CSP_MISSING,
    CONTENT_TYPE_OPTIONS_MISSING,
    FRAME_OPTIONS_MISSING,
    REFERRER_POLICY_MISSING,
];

/// Security response headers. Findings are site-scoped: a header missing
/// on every page is one defect, not one per page.
pub struct SecurityHeadersCheck;

impl CheckModule for SecurityHeadersCheck {
    fn name(&self) -> &'static str {
        "security_headers"
    }

    fn category(&self) -> Category {
        Category::SecurityHeaders
    }

    fn rules(&self) -> &'static [RuleSpec] {
        RULES
    }

    fn inspect(&self, page: &FetchedPage, _domain: &DomainConfig) -> Result<Vec<Finding>> {
        if !page.is_html() {
            return Ok(Vec::new());
        }

        let mut findings = Vec::new();
        let has = |name: &str| page.header(name).is_some_and(|v| !v.trim().is_empty());

        // HSTS is ignored by browsers over plain http
        if page.url.scheme() == "https" && !has("strict-transport-security") {
            findings.push(missing(&HSTS_MISSING, page, "strict-transport-security"));
        }

        let csp = page.header("content-security-policy");
        if csp.is_none() {
            findings.push(missing(&CSP_MISSING, page, "content-security-policy"));
        }

        match page.header("x-content-type-options") {
            Some(v) if v.trim().eq_ignore_ascii_case("nosniff") => {}
            observed => findings.push(weak(
                &CONTENT_TYPE_OPTIONS_MISSING,
                page,
                "x-content-type-options",
                observed,
            )),
        }

        let frame_ancestors = csp.is_some_and(|v| v.to_ascii_lowercase().contains("frame-ancestors"));
        if !has("x-frame-options") && !frame_ancestors {
            findings.push(missing(&FRAME_OPTIONS_MISSING, page, "x-frame-options"));
        }

        if !has("referrer-policy") {
            findings.push(missing(&REFERRER_POLICY_MISSING, page, "referrer-policy"));
        }

        Ok(findings)
    }
}

fn missing(rule: &RuleSpec, page: &FetchedPage, header: &str) -> Finding {
    weak(rule, page, header, None)
}

fn weak(rule: &RuleSpec, page: &FetchedPage, header: &str, observed: Option<&str>) -> Finding {
    let message = match observed {
        Some(value) => format!("{header} on {} has unexpected value {value:?}", page.url),
        None => format!("{header} not sent by {}", page.url),
    };
    Finding::from_rule(
        rule,
        &page.url,
        message,
        FindingDetail::SecurityHeader {
            header: header.to_string(),
            observed: observed.map(str::to_string),
        },
    )
    .with_evidence([page.url.to_string()])
}
