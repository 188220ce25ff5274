//! Stable defect identity.
//!
//! A fingerprint is the SHA-256 of a versioned canonical string built from
//! the domain, the category, the rule identifier, the optional rule
//! signature, and the route for route-scoped rules. Fields are separated by
//! the ASCII unit separator, which never occurs in hostnames, rule ids or
//! URL paths.

use sha2::{Digest, Sha256};
use vigil_checks::Finding;
use vigil_core::{Category, DomainId, Fingerprint};

const VERSION: &str = "v1";
const SEPARATOR: char = '\u{1f}';

/// The inputs a fingerprint is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintInput<'a> {
    /// Audited domain
    pub domain: &'a DomainId,
    /// Finding category
    pub category: Category,
    /// Rule identifier
    pub rule_id: &'a str,
    /// Extra identity within the rule (external link target, module name)
    pub signature: Option<&'a str>,
    /// Route, for route-scoped rules only
    pub route: Option<&'a str>,
}

impl<'a> FingerprintInput<'a> {
    /// Identity inputs of a finding on `domain`.
    #[must_use]
    pub fn from_finding(domain: &'a DomainId, finding: &'a Finding) -> Self {
        Self {
            domain,
            category: finding.category(),
            rule_id: &finding.rule_id,
            signature: finding.signature.as_deref(),
            route: finding.identity_route(),
        }
    }

    /// The exact string that gets hashed.
    #[must_use]
    pub fn canonical(&self) -> String {
        [
            VERSION,
            self.domain.as_str(),
            self.category.as_str(),
            self.rule_id,
            self.signature.unwrap_or_default(),
            self.route.unwrap_or_default(),
        ]
        .join(&SEPARATOR.to_string())
    }

    /// Hash the canonical string.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical().as_bytes());
        Fingerprint::from_digest(hasher.finalize())
    }
}

/// Fingerprint of a finding on `domain`.
#[must_use]
pub fn fingerprint(domain: &DomainId, finding: &Finding) -> Fingerprint {
    FingerprintInput::from_finding(domain, finding).fingerprint()
}
