//! Vigil Issues - from findings to tracked defects.
//!
//! Findings are ephemeral; issues persist. This crate owns the path between
//! them and everything computed from issues:
//!
//! - [`fingerprint`] - stable defect identity
//! - [`severity`] - the pure rule/band classifier
//! - [`assembler`] - [`IssueLedger`], the issue lifecycle state machine
//! - [`aggregator`] - run counts and the go/no-go verdict
//! - [`fix_packet`] - structured and narrative remediation payloads
//! - [`trend`] - daily per-category rollups
//! - [`store`] - persistence traits, with [`MemoryStore`] as an in-process backend
//!
//! Nothing here suspends except the store traits; the assembler,
//! classifier and aggregator are synchronous and side-effect free.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod aggregator;
pub mod assembler;
pub mod error;
pub mod fingerprint;
pub mod fix_packet;
pub mod issue;
pub mod memory;
pub mod run;
pub mod severity;
pub mod store;
pub mod suppression;
pub mod trend;

pub use aggregator::{go_no_go, GoNoGoPolicy, RunAggregator};
pub use assembler::{IssueLedger, Observation};
pub use error::{Result, StoreError};
pub use fingerprint::{fingerprint, FingerprintInput};
pub use fix_packet::{render_narrative, FixEntry, FixPacket, FixPacketGenerator, PacketSummary};
pub use issue::Issue;
pub use memory::MemoryStore;
pub use run::{DomainRunSummary, Run};
pub use severity::{classify, SeverityTable};
pub use store::{AuditStore, IssueFilter, IssueStore, RunStore, TrendStore};
pub use suppression::Suppression;
pub use trend::{rollup, TrendRow};
