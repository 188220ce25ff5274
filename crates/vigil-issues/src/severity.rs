//! Severity classification.
//!
//! [`classify`] is a pure function of the table, the category, the rule id
//! and an optional metric. Every matching entry is a candidate and the worst
//! candidate wins:
//!
//! - an exact rule entry (`seo.title_missing`)
//! - any wildcard whose prefix matches the rule (`seo.*` matches `seo.h1_missing`)
//! - a category wildcard (`security_headers.*`)
//! - the rule's metric band, when a metric is present

use std::collections::BTreeMap;
use vigil_core::{Category, MetricBand, Severity, SeverityConfig};

/// Rule and band tables the classifier reads.
#[derive(Debug, Clone, Default)]
pub struct SeverityTable {
    rules: BTreeMap<String, Severity>,
    bands: Vec<MetricBand>,
}

impl SeverityTable {
    /// Table from explicit entries.
    #[must_use]
    pub fn new(rules: BTreeMap<String, Severity>, bands: Vec<MetricBand>) -> Self {
        Self { rules, bands }
    }

    /// Effective table of a configuration (built-ins plus overrides).
    #[must_use]
    pub fn from_config(config: &SeverityConfig) -> Self {
        Self::new(config.effective_rules(), config.effective_bands())
    }

    /// Built-in table only.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_config(&SeverityConfig::default())
    }

    fn rule_candidates<'a>(
        &'a self,
        category: Category,
        rule_id: &'a str,
    ) -> impl Iterator<Item = Severity> + 'a {
        self.rules.iter().filter_map(move |(key, severity)| {
            let matches = match key.strip_suffix(".*") {
                Some(prefix) => {
                    prefix == category.as_str()
                        || rule_id
                            .strip_prefix(prefix)
                            .is_some_and(|rest| rest.starts_with('.'))
                }
                None => key == rule_id,
            };
            matches.then_some(*severity)
        })
    }

    fn band_candidates<'a>(
        &'a self,
        rule_id: &'a str,
        metric: Option<f64>,
    ) -> impl Iterator<Item = Severity> + 'a {
        self.bands
            .iter()
            .filter(move |band| band.rule == rule_id)
            .filter_map(move |band| metric.and_then(|value| band.severity_for(value)))
    }
}

/// Classify one finding. `None` when nothing in the table applies.
#[must_use]
pub fn classify(
    table: &SeverityTable,
    category: Category,
    rule_id: &str,
    metric: Option<f64>,
) -> Option<Severity> {
    table
        .rule_candidates(category, rule_id)
        .chain(table.band_candidates(rule_id, metric))
        .max()
}
