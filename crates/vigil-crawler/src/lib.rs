//! Vigil Crawler - budgeted crawling, verification and run orchestration.
//!
//! - [`CrawlEngine`] traverses one domain breadth-first within its page,
//!   depth and runtime budgets, pacing fetch starts to the domain's rate
//!   cap and running the resolved check modules on every page.
//! - [`VerificationEngine`] re-checks issues against freshly fetched pages
//!   and verifies, reopens or leaves them inconclusive.
//! - [`AuditOrchestrator`] runs whole audits: domains in tier order on a
//!   bounded worker pool, findings through the issue ledger into the store,
//!   and the run's go/no-go verdict.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use vigil_checks::CheckRegistry;
//! use vigil_crawler::AuditOrchestrator;
//!
//! let config = vigil_core::AppConfig::load_with_env()?;
//! let orchestrator = AuditOrchestrator::new(
//!     Arc::new(CheckRegistry::with_builtin()),
//!     vigil_browser::factory_from_config(&config.fetch),
//!     Arc::new(vigil_db::Database::open("vigil.db").await?),
//!     config,
//! );
//! let report = orchestrator.run(&CancellationToken::new()).await;
//! println!("{:?}", report.run.verdict);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod engine;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod pacer;
pub mod verify;

pub use engine::{CrawlEngine, CrawlOutcome, MAX_REDIRECT_HOPS};
pub use error::{CrawlError, Result};
pub use normalize::{normalize, same_origin};
pub use orchestrator::{AuditOrchestrator, RunReport};
pub use pacer::RatePacer;
pub use verify::{VerificationEngine, VerificationReport};
