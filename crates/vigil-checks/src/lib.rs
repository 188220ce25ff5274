//! Vigil Checks - page inspection for site audits.
//!
//! A [`CheckModule`] inspects one fetched page and returns [`Finding`]s.
//! Modules are grouped by [`Category`](vigil_core::Category) in a
//! [`CheckRegistry`], which resolves the module list for a run once and
//! isolates module failures so a broken module never aborts a crawl.
//!
//! # Example
//!
//! ```rust
//! use url::Url;
//! use vigil_browser::FetchedPage;
//! use vigil_checks::CheckRegistry;
//! use vigil_core::{Category, DomainConfig, DomainId};
//!
//! let registry = CheckRegistry::with_builtin();
//! let checks = registry.resolve(&[Category::Seo]);
//!
//! let page = FetchedPage::html(
//!     Url::parse("https://example.com/").unwrap(),
//!     200,
//!     "<html><body><h1>Welcome</h1></body></html>",
//! );
//! let domain = DomainConfig::new(DomainId::new("example.com").unwrap());
//!
//! let findings = checks.inspect(&page, &domain);
//! assert!(findings.iter().any(|f| f.rule_id == "seo.title_missing"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod finding;
mod html;
pub mod module;
pub mod modules;
pub mod registry;
pub mod rules;

pub use error::{CheckError, Result};
pub use finding::{Finding, FindingDetail, RuleScope};
pub use module::CheckModule;
pub use registry::{CheckRegistry, ResolvedChecks};
pub use rules::RuleSpec;
