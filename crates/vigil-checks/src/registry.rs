//! Category → module registry, resolved once per run.

use crate::error::{CheckError, Result};
use crate::finding::Finding;
use crate::module::CheckModule;
use crate::modules::{
    AccessControlCheck, AccessibilityCheck, ApiContractCheck, LinkIntegrityCheck,
    PerformanceCheck, SecurityHeadersCheck, SeoCheck,
};
use crate::rules;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vigil_browser::FetchedPage;
use vigil_core::{Category, DomainConfig};

/// Registered check modules, grouped by category in registration order.
#[derive(Clone, Default)]
pub struct CheckRegistry {
    modules: BTreeMap<Category, Vec<Arc<dyn CheckModule>>>,
}

impl CheckRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in module.
    #[must_use]
    pub fn with_builtin() -> Self {
        let builtin: [Arc<dyn CheckModule>; 7] = [
            Arc::new(LinkIntegrityCheck),
            Arc::new(SeoCheck),
            Arc::new(SecurityHeadersCheck),
            Arc::new(PerformanceCheck::default()),
            Arc::new(AccessibilityCheck),
            Arc::new(ApiContractCheck),
            Arc::new(AccessControlCheck),
        ];

        let mut registry = Self::new();
        for module in builtin {
            let category = module.category();
            registry.modules.entry(category).or_default().push(module);
        }
        registry
    }

    /// Add a module to the end of its category's list.
    ///
    /// # Errors
    /// Returns error if a module with the same name is already registered.
    pub fn register(&mut self, module: Arc<dyn CheckModule>) -> Result<()> {
        if self.all().any(|m| m.name() == module.name()) {
            return Err(CheckError::DuplicateModule(module.name().to_string()));
        }
        debug!(module = module.name(), category = %module.category(), "registered check module");
        self.modules.entry(module.category()).or_default().push(module);
        Ok(())
    }

    /// Modules registered for `category`.
    #[must_use]
    pub fn get_by_category(&self, category: Category) -> &[Arc<dyn CheckModule>] {
        self.modules.get(&category).map(Vec::as_slice).unwrap_or_default()
    }

    /// Total number of registered modules.
    #[must_use]
    pub fn count(&self) -> usize {
        self.modules.values().map(Vec::len).sum()
    }

    /// Resolve the ordered module list for a run's category set.
    #[must_use]
    pub fn resolve(&self, categories: &[Category]) -> ResolvedChecks {
        let mut wanted: Vec<Category> = categories.to_vec();
        wanted.sort();
        wanted.dedup();

        let modules: Vec<_> = wanted
            .iter()
            .flat_map(|c| self.get_by_category(*c).iter().cloned())
            .collect();

        info!(
            categories = wanted.len(),
            modules = modules.len(),
            "resolved check modules"
        );
        ResolvedChecks { modules }
    }

    fn all(&self) -> impl Iterator<Item = &Arc<dyn CheckModule>> {
        self.modules.values().flatten()
    }
}

impl fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.all().map(|m| m.name()).collect();
        f.debug_struct("CheckRegistry").field("modules", &names).finish()
    }
}

/// The module list a run uses for every page.
#[derive(Clone, Default)]
pub struct ResolvedChecks {
    modules: Vec<Arc<dyn CheckModule>>,
}

impl ResolvedChecks {
    /// Modules in execution order.
    #[must_use]
    pub fn modules(&self) -> &[Arc<dyn CheckModule>] {
        &self.modules
    }

    /// No modules resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Run every module on a page.
    ///
    /// A module returning `Err` or panicking yields one `check.module_failed`
    /// finding for that module and page; the remaining modules still run.
    #[must_use]
    pub fn inspect(&self, page: &FetchedPage, domain: &DomainConfig) -> Vec<Finding> {
        let mut findings = Vec::new();

        for module in &self.modules {
            let outcome = catch_unwind(AssertUnwindSafe(|| module.inspect(page, domain)))
                .unwrap_or_else(|payload| {
                    Err(CheckError::Panicked {
                        module: module.name().to_string(),
                        message: panic_message(payload.as_ref()),
                    })
                });

            match outcome {
                Ok(mut produced) => findings.append(&mut produced),
                Err(e) => {
                    warn!(
                        module = module.name(),
                        url = %page.url,
                        "check module failed: {}",
                        e
                    );
                    findings.push(rules::module_failed(
                        &page.url,
                        module.name(),
                        module.category(),
                        &e.to_string(),
                    ));
                }
            }
        }

        findings
    }
}

impl fmt::Debug for ResolvedChecks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.modules.iter().map(|m| m.name()).collect();
        f.debug_tuple("ResolvedChecks").field(&names).finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
