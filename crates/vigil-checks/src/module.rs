//! The check module trait.

use crate::error::Result;
use crate::finding::Finding;
use crate::rules::RuleSpec;
use vigil_browser::FetchedPage;
use vigil_core::{Category, DomainConfig};

/// A check that inspects one fetched page.
///
/// Expected absence of a feature (a missing tag, a missing header) is a
/// finding, not an error. `Err` is reserved for the module itself failing.
pub trait CheckModule: Send + Sync {
    /// Stable module name.
    fn name(&self) -> &'static str;

    /// Category every finding of this module belongs to.
    fn category(&self) -> Category;

    /// Rules this module can emit.
    fn rules(&self) -> &'static [RuleSpec];

    /// Inspect a successfully fetched page.
    fn inspect(&self, page: &FetchedPage, domain: &DomainConfig) -> Result<Vec<Finding>>;
}
