//! Findings: the ephemeral output of one check against one page.
//!
//! Every finding shares one envelope (rule, route, scope, evidence, …) and
//! carries a closed, category-specific [`FindingDetail`] payload. The
//! category is derived from the payload so the two can never disagree.

use crate::rules::RuleSpec;
use serde::{Deserialize, Serialize};
use url::Url;
use vigil_browser::route_of;
use vigil_core::{Category, Severity};

/// Whether a rule's identity includes the route it was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    /// One defect per route (missing title on `/about`)
    Route,
    /// One defect per domain (missing HSTS header)
    Site,
}

/// Category-specific payload of a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingDetail {
    /// A link on the page is broken, insecure, or leaves the domain
    Link {
        /// Link targets involved
        targets: Vec<String>,
    },
    /// The page could not be fetched, or answered with an error status
    FetchFailure {
        /// Fetcher error or status description
        error: String,
        /// Response status when one was received
        status: Option<u16>,
    },
    /// A redirect chain exceeded the hop limit or left the domain
    Redirect {
        /// URLs visited, in order
        chain: Vec<String>,
    },
    /// Search-engine metadata problem
    Seo {
        /// Element or attribute concerned (`title`, `meta[name=description]`)
        element: String,
        /// Observed value, when there was one
        observed: Option<String>,
    },
    /// Missing or weak security response header
    SecurityHeader {
        /// Header name, lowercase
        header: String,
        /// Observed value, when there was one
        observed: Option<String>,
    },
    /// A measured value exceeded its budget
    Performance {
        /// Metric name
        metric: String,
        /// Measured value
        value: f64,
        /// Reporting budget
        budget: f64,
    },
    /// Accessibility defect
    Accessibility {
        /// Element concerned
        element: String,
        /// Number of offending elements
        count: usize,
    },
    /// Response does not honour its declared contract
    ApiContract {
        /// Expected shape
        expected: String,
        /// What was observed
        observed: String,
    },
    /// A resource that should be protected is exposed
    AccessControl {
        /// What gave the exposure away
        indicator: String,
    },
    /// A check module failed on this page
    ModuleFailure {
        /// Module name
        module: String,
        /// Category of the failing module
        category: Category,
        /// Failure description
        error: String,
    },
}

impl FindingDetail {
    /// Category the payload belongs to.
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Self::Link { .. } | Self::FetchFailure { .. } | Self::Redirect { .. } => {
                Category::LinkIntegrity
            }
            Self::Seo { .. } => Category::Seo,
            Self::SecurityHeader { .. } => Category::SecurityHeaders,
            Self::Performance { .. } | Self::Accessibility { .. } => Category::Performance,
            Self::ApiContract { .. } => Category::ApiContract,
            Self::AccessControl { .. } => Category::AccessControl,
            Self::ModuleFailure { category, .. } => *category,
        }
    }
}

/// One check result on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Rule identifier, e.g. `seo.title_missing`
    pub rule_id: String,
    /// Short human title of the rule
    pub title: String,
    /// Page-specific description
    pub message: String,
    /// Severity suggested by the module when no rule table entry applies
    pub severity_hint: Severity,
    /// Whether the rule's remediation can be applied mechanically
    pub auto_fixable: bool,
    /// Identity scope of the rule
    pub scope: RuleScope,
    /// Page URL the finding was produced on
    pub page_url: String,
    /// Route (path) of the page
    pub route: String,
    /// Extra identity beyond rule and route (e.g. an external link target)
    pub signature: Option<String>,
    /// Evidence references (snippets, header values, URLs)
    pub evidence: Vec<String>,
    /// Numeric measurement for band classification
    pub metric: Option<f64>,
    /// Category payload
    pub detail: FindingDetail,
}

impl Finding {
    /// Finding for `rule` on `page_url`.
    #[must_use]
    pub fn from_rule(
        rule: &RuleSpec,
        page_url: &Url,
        message: impl Into<String>,
        detail: FindingDetail,
    ) -> Self {
        Self {
            rule_id: rule.id.to_string(),
            title: rule.title.to_string(),
            message: message.into(),
            severity_hint: rule.severity_hint,
            auto_fixable: rule.auto_fixable,
            scope: rule.scope,
            page_url: page_url.to_string(),
            route: route_of(page_url),
            signature: None,
            evidence: Vec::new(),
            metric: None,
            detail,
        }
    }

    /// Category derived from the payload.
    #[must_use]
    pub fn category(&self) -> Category {
        self.detail.category()
    }

    /// Route used for identity, `None` for site-scoped rules.
    #[must_use]
    pub fn identity_route(&self) -> Option<&str> {
        match self.scope {
            RuleScope::Route => Some(&self.route),
            RuleScope::Site => None,
        }
    }

    /// Attach evidence references.
    #[must_use]
    pub fn with_evidence<I, S>(mut self, evidence: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evidence.extend(evidence.into_iter().map(Into::into));
        self
    }

    /// Attach a measurement.
    #[must_use]
    pub fn with_metric(mut self, value: f64) -> Self {
        self.metric = Some(value);
        self
    }

    /// Attach an identity signature.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}
