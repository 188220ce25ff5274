//! Vigil Core - Foundation crate for the vigil site audit engine.
//!
//! This crate provides shared types, error handling, configuration management,
//! and logging setup that all other vigil crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Shared newtypes and enums (`DomainId`, `RunId`, `Fingerprint`, `Severity`, `Category`)
//! - [`logging`] - `tracing-subscriber` initialisation
//!
//! # Example
//!
//! ```rust
//! use vigil_core::{AppConfig, Severity};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_toml_str(
//!     r#"
//! [[domains]]
//! hostname = "example.com"
//! "#,
//! )?;
//! assert_eq!(config.domains.len(), 1);
//! assert!(Severity::Blocker > Severity::High);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, DomainConfig, FetchConfig, MetricBand, MetricDirection, RunConfig, SeverityConfig,
    Threshold,
};
pub use error::{ConfigError, ConfigResult, CoreError, Result};
pub use types::{
    Category, DomainId, DomainStatus, Fingerprint, IssueStatus, RunId, RunStatus, Severity,
    SeverityCounts, StopReason, Verdict,
};
