//! Shared types used across the vigil audit engine.
//!
//! This module defines common newtypes and enums that provide type safety
//! and clear domain modeling.

use crate::error::CoreError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Newtype for audited domain identifiers.
///
/// A domain is identified by its lowercase hostname (`example.com`,
/// `shop.example.co.uk`). Ports and schemes are not part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainId(String);

impl DomainId {
    /// Create a new `DomainId` from a hostname.
    ///
    /// The hostname is lowercased before validation.
    ///
    /// # Errors
    /// Returns error if the hostname is not a valid DNS name or `localhost`.
    pub fn new(hostname: impl Into<String>) -> Result<Self, CoreError> {
        let hostname = hostname.into().trim().to_ascii_lowercase();
        Self::validate(&hostname)?;
        Ok(Self(hostname))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(hostname: &str) -> Result<(), CoreError> {
        static HOST_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = HOST_REGEX.get_or_init(|| {
            Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?(\.[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?)*$")
                .expect("valid regex")
        });

        if hostname.is_empty() || hostname.len() > 253 {
            return Err(CoreError::Validation(format!(
                "invalid hostname: must be 1-253 characters, got {} characters",
                hostname.len()
            )));
        }

        if regex.is_match(hostname) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "invalid hostname: '{hostname}'"
            )))
        }
    }
}

impl TryFrom<String> for DomainId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DomainId> for String {
    fn from(value: DomainId) -> Self {
        value.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one audit or verification run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Create a new random `RunId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier (e.g. read back from storage).
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of a defect: a lowercase hex SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Length of the hex encoding of a SHA-256 digest.
    pub const HEX_LEN: usize = 64;

    /// Parse a fingerprint from its hex form.
    ///
    /// # Errors
    /// Returns error if the value is not 64 lowercase hex characters.
    pub fn from_hex(hex: impl Into<String>) -> Result<Self, CoreError> {
        let hex = hex.into();
        if hex.len() == Self::HEX_LEN
            && hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            Ok(Self(hex))
        } else {
            Err(CoreError::Validation(format!(
                "invalid fingerprint: expected {} lowercase hex characters, got '{hex}'",
                Self::HEX_LEN
            )))
        }
    }

    /// Fingerprint from raw SHA-256 digest bytes.
    #[must_use]
    pub fn from_digest(digest: impl AsRef<[u8]>) -> Self {
        Self(hex::encode(digest))
    }

    /// Get the hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(value)
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered defect severity. `Blocker > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Cosmetic or informational
    Low,
    /// Should be fixed in the normal course of work
    Medium,
    /// Must be fixed soon; many of these turn a run yellow
    High,
    /// Release-blocking; a single one turns a run red
    Blocker,
}

impl Severity {
    /// All severities, worst first.
    pub const ALL_DESC: [Severity; 4] = [Self::Blocker, Self::High, Self::Medium, Self::Low];

    /// Wire name (`BLOCKER`, `HIGH`, `MEDIUM`, `LOW`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Blocker => "BLOCKER",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "BLOCKER" => Ok(Self::Blocker),
            _ => Err(CoreError::Validation(format!("unknown severity '{s}'"))),
        }
    }
}

/// Check categories. New categories are served by registering new check
/// modules; the engines never branch on a category except to select modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Broken, insecure, or external links and unreachable pages
    LinkIntegrity,
    /// Search-engine metadata
    Seo,
    /// HTTP security response headers
    SecurityHeaders,
    /// Performance budgets and accessibility
    Performance,
    /// API response contracts
    ApiContract,
    /// Exposure of resources that should be protected
    AccessControl,
}

impl Category {
    /// Every known category.
    pub const ALL: [Category; 6] = [
        Self::LinkIntegrity,
        Self::Seo,
        Self::SecurityHeaders,
        Self::Performance,
        Self::ApiContract,
        Self::AccessControl,
    ];

    /// Stable wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LinkIntegrity => "link_integrity",
            Self::Seo => "seo",
            Self::SecurityHeaders => "security_headers",
            Self::Performance => "performance",
            Self::ApiContract => "api_contract",
            Self::AccessControl => "access_control",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::LinkIntegrity => "Link Integrity",
            Self::Seo => "SEO",
            Self::SecurityHeaders => "Security Headers",
            Self::Performance => "Performance & Accessibility",
            Self::ApiContract => "API Contract",
            Self::AccessControl => "Access Control",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("unknown category '{s}'")))
    }
}

/// Lifecycle status of a persisted issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// Observed and not yet addressed (also the reopened state)
    Open,
    /// A fix has been attempted and awaits verification
    Fixing,
    /// Verification confirmed the defect is gone
    Verified,
    /// Explicitly excluded from scoring and fix packets
    Suppressed,
    /// Accepted as-is; never reopened automatically
    #[serde(rename = "wontfix")]
    WontFix,
}

impl IssueStatus {
    /// Stable wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Fixing => "fixing",
            Self::Verified => "verified",
            Self::Suppressed => "suppressed",
            Self::WontFix => "wontfix",
        }
    }

    /// Open or fixing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Open | Self::Fixing)
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "fixing" => Ok(Self::Fixing),
            "verified" => Ok(Self::Verified),
            "suppressed" => Ok(Self::Suppressed),
            "wontfix" => Ok(Self::WontFix),
            _ => Err(CoreError::Validation(format!("unknown issue status '{s}'"))),
        }
    }
}

/// Status of an audit run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Domains are still being audited
    Running,
    /// All domains processed, or the runtime deadline stopped the run
    Complete,
    /// No domain could be audited
    Failed,
    /// Cancelled from outside before completion
    Cancelled,
}

impl RunStatus {
    /// Stable wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(CoreError::Validation(format!("unknown run status '{s}'"))),
        }
    }
}

/// Outcome of one domain within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    /// Frontier exhausted within every budget
    Complete,
    /// A budget or the run deadline stopped traversal early
    Partial,
    /// The page fetcher could not be acquired
    Failed,
    /// The run deadline fired before the domain started
    Skipped,
}

impl DomainStatus {
    /// Stable wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "complete" => Ok(Self::Complete),
            "partial" => Ok(Self::Partial),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            _ => Err(CoreError::Validation(format!("unknown domain status '{s}'"))),
        }
    }
}

/// Why a domain crawl stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Nothing left to fetch
    FrontierExhausted,
    /// Page budget reached
    PageBudget,
    /// Links beyond the depth budget were left unvisited
    DepthBudget,
    /// The domain's own runtime budget elapsed
    RuntimeBudget,
    /// The run-level deadline fired
    Deadline,
    /// The run was cancelled
    Cancelled,
}

impl StopReason {
    /// Stable wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FrontierExhausted => "frontier_exhausted",
            Self::PageBudget => "page_budget",
            Self::DepthBudget => "depth_budget",
            Self::RuntimeBudget => "runtime_budget",
            Self::Deadline => "deadline",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether traversal ended before the frontier was exhausted.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !matches!(self, Self::FrontierExhausted)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StopReason {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frontier_exhausted" => Ok(Self::FrontierExhausted),
            "page_budget" => Ok(Self::PageBudget),
            "depth_budget" => Ok(Self::DepthBudget),
            "runtime_budget" => Ok(Self::RuntimeBudget),
            "deadline" => Ok(Self::Deadline),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(CoreError::Validation(format!("unknown stop reason '{s}'"))),
        }
    }
}

/// Aggregate health verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// Go
    Green,
    /// Go with caution
    Yellow,
    /// No-go
    Red,
}

impl Verdict {
    /// Wire name (`GREEN`, `YELLOW`, `RED`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GREEN" => Ok(Self::Green),
            "YELLOW" => Ok(Self::Yellow),
            "RED" => Ok(Self::Red),
            _ => Err(CoreError::Validation(format!("unknown verdict '{s}'"))),
        }
    }
}

/// Per-severity issue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct SeverityCounts {
    /// Number of BLOCKER issues
    pub blocker: u32,
    /// Number of HIGH issues
    pub high: u32,
    /// Number of MEDIUM issues
    pub medium: u32,
    /// Number of LOW issues
    pub low: u32,
}

impl SeverityCounts {
    /// Build counts from explicit values.
    #[must_use]
    pub fn new(blocker: u32, high: u32, medium: u32, low: u32) -> Self {
        Self {
            blocker,
            high,
            medium,
            low,
        }
    }

    /// Count one more issue of the given severity.
    pub fn record(&mut self, severity: Severity) {
        *self.slot(severity) += 1;
    }

    /// Count for one severity.
    #[must_use]
    pub fn get(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Blocker => self.blocker,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    /// Sum across severities.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.blocker + self.high + self.medium + self.low
    }

    /// Add another set of counts into this one.
    pub fn merge(&mut self, other: &Self) {
        self.blocker += other.blocker;
        self.high += other.high;
        self.medium += other.medium;
        self.low += other.low;
    }

    fn slot(&mut self, severity: Severity) -> &mut u32 {
        match severity {
            Severity::Blocker => &mut self.blocker,
            Severity::High => &mut self.high,
            Severity::Medium => &mut self.medium,
            Severity::Low => &mut self.low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_id_normalises_case() {
        let id = DomainId::new("Shop.Example.COM").expect("valid hostname");
        assert_eq!(id.as_str(), "shop.example.com");
    }

    #[test]
    fn test_domain_id_invalid() {
        assert!(DomainId::new("").is_err());
        assert!(DomainId::new("https://example.com").is_err());
        assert!(DomainId::new("-bad.example.com").is_err());
        assert!(DomainId::new("exa mple.com").is_err());
    }

    #[test]
    fn test_domain_id_serde_validates() {
        let ok: DomainId = serde_json::from_str("\"example.com\"").expect("deserialize");
        assert_eq!(ok.as_str(), "example.com");
        assert!(serde_json::from_str::<DomainId>("\"not a host\"").is_err());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Blocker > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(
            [Severity::Low, Severity::Blocker, Severity::Medium]
                .into_iter()
                .max(),
            Some(Severity::Blocker)
        );
    }

    #[test]
    fn test_severity_wire_names() {
        let json = serde_json::to_string(&Severity::Blocker).expect("serialize");
        assert_eq!(json, "\"BLOCKER\"");
        assert_eq!("high".parse::<Severity>().expect("parse"), Severity::High);
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn test_category_roundtrip_names() {
        for category in Category::ALL {
            assert_eq!(
                category.as_str().parse::<Category>().expect("parse"),
                category
            );
        }
    }

    #[test]
    fn test_issue_status_wontfix_name() {
        let json = serde_json::to_string(&IssueStatus::WontFix).expect("serialize");
        assert_eq!(json, "\"wontfix\"");
        assert!(IssueStatus::Fixing.is_active());
        assert!(!IssueStatus::Suppressed.is_active());
    }

    #[test]
    fn test_fingerprint_validation() {
        let hex = "a".repeat(64);
        let fp = Fingerprint::from_hex(hex.clone()).expect("valid fingerprint");
        assert_eq!(fp.as_str(), hex);
        assert_eq!(fp.short().len(), 12);
        assert!(Fingerprint::from_hex("abc").is_err());
        assert!(Fingerprint::from_hex("A".repeat(64)).is_err());
    }

    #[test]
    fn test_severity_counts() {
        let mut counts = SeverityCounts::default();
        counts.record(Severity::High);
        counts.record(Severity::High);
        counts.record(Severity::Low);
        assert_eq!(counts.get(Severity::High), 2);
        assert_eq!(counts.total(), 3);

        let mut other = SeverityCounts::new(1, 0, 0, 0);
        other.merge(&counts);
        assert_eq!(other, SeverityCounts::new(1, 2, 0, 1));

        let json = serde_json::to_value(other).expect("serialize");
        assert_eq!(json["BLOCKER"], 1);
        assert_eq!(json["HIGH"], 2);
    }
}
