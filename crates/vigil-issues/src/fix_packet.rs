//! Fix packets: remediation payloads for open issues.
//!
//! The structured [`FixPacket`] is the only authored form. The narrative is
//! produced by [`render_narrative`] from the packet alone, so the two can
//! never disagree.

use crate::issue::Issue;
use crate::suppression::Suppression;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{self, Write};
use vigil_core::{Category, DomainId, Fingerprint, IssueStatus, RunId, Severity};

/// Static remediation guidance for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemediationTemplate {
    /// What to change
    pub recommended_fix: &'static str,
    /// Conditions that must hold once fixed
    pub acceptance_criteria: &'static [&'static str],
}

/// Remediation template for a category.
#[must_use]
pub fn remediation_for(category: Category) -> RemediationTemplate {
    match category {
        Category::LinkIntegrity => RemediationTemplate {
            recommended_fix: "Repair or remove the failing link target. Point internal links at the final URL instead of a redirect, and serve moved content with a single permanent redirect.",
            acceptance_criteria: &[
                "The route answers with a 2xx status",
                "No link on the site leads through more than one redirect",
            ],
        },
        Category::Seo => RemediationTemplate {
            recommended_fix: "Add the missing metadata to the page template: a unique descriptive <title> under 60 characters, a meta description, one <h1>, and a canonical link.",
            acceptance_criteria: &[
                "The page renders the required metadata element with non-empty content",
                "The metadata is unique to the route",
            ],
        },
        Category::SecurityHeaders => RemediationTemplate {
            recommended_fix: "Send the missing response header from the edge or application server for every HTML response on the domain.",
            acceptance_criteria: &[
                "The header is present on every HTML response of the domain",
                "The header value follows the recommended hardening profile",
            ],
        },
        Category::Performance => RemediationTemplate {
            recommended_fix: "Reduce response time and transfer size: cache server responses, compress and lazy-load assets, fix script errors, and provide text alternatives and a document language.",
            acceptance_criteria: &[
                "The measured value is within budget on a repeat fetch",
                "No script errors or accessibility violations are reported for the route",
            ],
        },
        Category::ApiContract => RemediationTemplate {
            recommended_fix: "Make the endpoint's body honour its declared content type, or correct the declared content type.",
            acceptance_criteria: &[
                "The response body parses as the declared media type",
            ],
        },
        Category::AccessControl => RemediationTemplate {
            recommended_fix: "Disable automatic directory indexes and restrict the exposed path to authorised users.",
            acceptance_criteria: &[
                "The path no longer serves a generated index",
                "Unauthenticated requests are denied or redirected",
            ],
        },
    }
}

/// Severity totals of a packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketSummary {
    /// BLOCKER entries
    #[serde(rename = "BLOCKER")]
    pub blocker: u32,
    /// HIGH entries
    #[serde(rename = "HIGH")]
    pub high: u32,
    /// MEDIUM entries
    #[serde(rename = "MEDIUM")]
    pub medium: u32,
    /// LOW entries
    #[serde(rename = "LOW")]
    pub low: u32,
    /// Entries whose fix can be applied mechanically
    #[serde(rename = "autoFixable")]
    pub auto_fixable: u32,
}

impl PacketSummary {
    fn record(&mut self, entry: &FixEntry) {
        match entry.severity {
            Severity::Blocker => self.blocker += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
        if entry.auto_fixable {
            self.auto_fixable += 1;
        }
    }
}

/// One issue in a packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixEntry {
    /// Issue identity
    pub fingerprint: Fingerprint,
    /// Domain
    pub domain: DomainId,
    /// Severity
    pub severity: Severity,
    /// Category
    pub category: Category,
    /// Rule identifier
    pub rule_id: String,
    /// Route, or the affected page for site-wide rules
    pub route: String,
    /// Issue title
    pub title: String,
    /// Issue description
    pub description: String,
    /// Evidence references
    pub evidence: Vec<String>,
    /// Whether the fix can be applied mechanically
    pub auto_fixable: bool,
    /// Whether verification already found a fix attempt wanting
    pub needs_escalation: bool,
    /// Category remediation
    pub recommended_fix: String,
    /// Checklist for accepting the fix
    pub acceptance_criteria: Vec<String>,
    /// How to re-check the fix
    pub verification: Vec<String>,
}

impl FixEntry {
    fn from_issue(issue: &Issue) -> Self {
        let template = remediation_for(issue.category);
        let mut acceptance_criteria: Vec<String> = template
            .acceptance_criteria
            .iter()
            .map(|c| (*c).to_string())
            .collect();
        acceptance_criteria.push(format!(
            "`{}` is no longer reported for {}",
            issue.rule_id,
            issue.location()
        ));

        Self {
            fingerprint: issue.fingerprint.clone(),
            domain: issue.domain.clone(),
            severity: issue.severity,
            category: issue.category,
            rule_id: issue.rule_id.clone(),
            route: issue.location().to_string(),
            title: issue.title.clone(),
            description: issue.description.clone(),
            evidence: issue.evidence.clone(),
            auto_fixable: issue.auto_fixable,
            needs_escalation: issue.needs_escalation,
            recommended_fix: template.recommended_fix.to_string(),
            acceptance_criteria,
            verification: vec![
                format!("category:{}", issue.category),
                format!("url:{}", issue.page_url),
                format!("fingerprint:{}", issue.fingerprint),
            ],
        }
    }
}

/// Remediation payload for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixPacket {
    /// Run the packet was generated for
    pub run_id: RunId,
    /// Generation time
    pub generated_at: DateTime<Utc>,
    /// Totals
    pub summary: PacketSummary,
    /// Entries, most severe first
    pub issues: Vec<FixEntry>,
}

impl FixPacket {
    /// Entries of one severity, in packet order.
    pub fn entries(&self, severity: Severity) -> impl Iterator<Item = &FixEntry> {
        self.issues.iter().filter(move |e| e.severity == severity)
    }

    /// JSON form.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Builds fix packets from issues.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixPacketGenerator {
    min_severity: Option<Severity>,
}

impl FixPacketGenerator {
    /// Generator including every severity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only include issues at or above `severity`.
    #[must_use]
    pub fn min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    /// Packet over the open, unsuppressed issues among `issues`.
    ///
    /// Entries are ordered by severity (worst first), then category, route
    /// and fingerprint, so equal inputs give byte-identical packets.
    #[must_use]
    pub fn generate<'a>(
        &self,
        run_id: &RunId,
        issues: impl IntoIterator<Item = &'a Issue>,
        suppressions: &[Suppression],
        now: DateTime<Utc>,
    ) -> FixPacket {
        let suppressed: HashSet<&Fingerprint> = suppressions
            .iter()
            .filter(|s| s.is_active(now))
            .map(|s| &s.fingerprint)
            .collect();

        let mut entries: Vec<FixEntry> = issues
            .into_iter()
            .filter(|i| matches!(i.status, IssueStatus::Open | IssueStatus::Fixing))
            .filter(|i| !suppressed.contains(&i.fingerprint))
            .filter(|i| self.min_severity.map_or(true, |min| i.severity >= min))
            .map(FixEntry::from_issue)
            .collect();

        entries.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.category.cmp(&b.category))
                .then_with(|| a.route.cmp(&b.route))
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        });
        entries.dedup_by(|a, b| a.fingerprint == b.fingerprint);

        let mut summary = PacketSummary::default();
        for entry in &entries {
            summary.record(entry);
        }

        FixPacket {
            run_id: run_id.clone(),
            generated_at: now,
            summary,
            issues: entries,
        }
    }
}

/// Markdown rendering of a packet, grouped by severity.
#[must_use]
pub fn render_narrative(packet: &FixPacket) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_narrative(&mut out, packet);
    out
}

fn write_narrative(out: &mut String, packet: &FixPacket) -> fmt::Result {
    let s = &packet.summary;

    writeln!(out, "# Fix packet for run {}", packet.run_id)?;
    writeln!(out)?;
    writeln!(out, "Generated {}.", packet.generated_at.to_rfc3339())?;
    writeln!(
        out,
        "{} BLOCKER, {} HIGH, {} MEDIUM, {} LOW; {} auto-fixable.",
        s.blocker, s.high, s.medium, s.low, s.auto_fixable
    )?;

    for severity in Severity::ALL_DESC {
        let entries: Vec<&FixEntry> = packet.entries(severity).collect();
        if entries.is_empty() {
            continue;
        }

        writeln!(out)?;
        writeln!(out, "## {severity} ({})", entries.len())?;

        for entry in entries {
            write_entry(out, entry)?;
        }
    }

    Ok(())
}

fn write_entry(out: &mut String, entry: &FixEntry) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "### {} ({} `{}`)", entry.title, entry.domain, entry.route)?;
    writeln!(out)?;
    writeln!(
        out,
        "Category: {}. Rule: `{}`. Fingerprint: `{}`.{}{}",
        entry.category.display_name(),
        entry.rule_id,
        entry.fingerprint.short(),
        if entry.auto_fixable { " Auto-fixable." } else { "" },
        if entry.needs_escalation {
            " Previous fix did not hold."
        } else {
            ""
        }
    )?;
    writeln!(out)?;
    writeln!(out, "{}", entry.description)?;
    if !entry.evidence.is_empty() {
        writeln!(out)?;
        writeln!(out, "Evidence:")?;
        for item in &entry.evidence {
            writeln!(out, "- `{item}`")?;
        }
    }
    writeln!(out)?;
    writeln!(out, "Fix: {}", entry.recommended_fix)?;
    writeln!(out)?;
    writeln!(out, "Acceptance criteria:")?;
    for criterion in &entry.acceptance_criteria {
        writeln!(out, "- [ ] {criterion}")?;
    }
    writeln!(out)?;
    writeln!(out, "Verify with: {}", entry.verification.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::IssueLedger;
    use crate::severity::SeverityTable;
    use url::Url;
    use vigil_checks::rules;

    fn issues() -> Vec<Issue> {
        let domain = DomainId::new("example.com").unwrap();
        let run = RunId::from_string("run-1");
        let now = Utc::now();
        let mut ledger = IssueLedger::new(SeverityTable::builtin());
        let base = Url::parse("https://example.com/").unwrap();

        ledger.observe(&domain, &rules::http_status(&base.join("/a").unwrap(), 404), &run, now);
        ledger.observe(&domain, &rules::http_status(&base.join("/b").unwrap(), 503), &run, now);
        ledger.observe(
            &domain,
            &rules::external_link(&base, &Url::parse("https://other.org/").unwrap()),
            &run,
            now,
        );
        ledger.take_changes()
    }

    #[test]
    fn test_packet_orders_by_severity() {
        let now = Utc::now();
        let issues = issues();
        let packet = FixPacketGenerator::new().generate(&RunId::from_string("run-1"), &issues, &[], now);

        let severities: Vec<_> = packet.issues.iter().map(|e| e.severity).collect();
        assert_eq!(severities, vec![Severity::Blocker, Severity::High, Severity::Low]);
        assert_eq!(packet.summary.blocker, 1);
        assert_eq!(packet.summary.high, 1);
        assert_eq!(packet.summary.low, 1);
        assert_eq!(packet.issues[0].route, "/b");
        assert!(packet.issues[0]
            .acceptance_criteria
            .iter()
            .any(|c| c.contains("crawl.http_status")));
    }

    #[test]
    fn test_min_severity_and_suppressions() {
        let now = Utc::now();
        let issues = issues();
        let blocker = issues
            .iter()
            .find(|i| i.severity == Severity::Blocker)
            .unwrap()
            .fingerprint
            .clone();

        let packet = FixPacketGenerator::new()
            .min_severity(Severity::High)
            .generate(
                &RunId::from_string("run-1"),
                &issues,
                &[Suppression::new(blocker, "accepted", now)],
                now,
            );

        assert_eq!(packet.issues.len(), 1);
        assert_eq!(packet.issues[0].severity, Severity::High);
    }

    #[test]
    fn test_closed_issues_excluded() {
        let now = Utc::now();
        let mut issues = issues();
        for issue in &mut issues {
            issue.status = IssueStatus::Verified;
        }
        let packet = FixPacketGenerator::new().generate(&RunId::from_string("r"), &issues, &[], now);
        assert!(packet.issues.is_empty());
        assert_eq!(packet.summary, PacketSummary::default());
    }

    #[test]
    fn test_json_schema_keys() {
        let issues = issues();
        let packet =
            FixPacketGenerator::new().generate(&RunId::from_string("run-1"), &issues, &[], Utc::now());
        let value: serde_json::Value = serde_json::from_str(&packet.to_json().unwrap()).unwrap();

        assert_eq!(value["runId"], "run-1");
        assert!(value["generatedAt"].is_string());
        assert_eq!(value["summary"]["BLOCKER"], 1);
        assert_eq!(value["summary"]["autoFixable"], 0);
        let entry = &value["issues"][0];
        for key in [
            "fingerprint",
            "severity",
            "category",
            "route",
            "title",
            "description",
            "recommendedFix",
            "acceptanceCriteria",
            "verification",
        ] {
            assert!(entry.get(key).is_some(), "missing {key}");
        }
        assert_eq!(entry["severity"], "BLOCKER");
    }

    #[test]
    fn test_narrative_mirrors_packet() {
        let now = Utc::now();
        let issues = issues();
        let packet = FixPacketGenerator::new().generate(&RunId::from_string("run-1"), &issues, &[], now);
        let narrative = render_narrative(&packet);

        assert_eq!(narrative, render_narrative(&packet));
        let blocker = narrative.find("## BLOCKER (1)").unwrap();
        let high = narrative.find("## HIGH (1)").unwrap();
        let low = narrative.find("## LOW (1)").unwrap();
        assert!(blocker < high && high < low);
        assert!(!narrative.contains("## MEDIUM"));
        for entry in &packet.issues {
            assert!(narrative.contains(entry.fingerprint.short()));
        }
    }
}
