//! Vigil Database Layer
//!
//! `SQLite` persistence for issues, suppressions, runs and trend rollups,
//! using `SQLx` with embedded migrations.
//!
//! # Example
//!
//! ```ignore
//! use vigil_db::Database;
//! use vigil_issues::{IssueFilter, IssueStore};
//!
//! let db = Database::new("vigil.db").await?;
//! db.run_migrations().await?;
//! let open = db.list_issues(&IssueFilter::all()).await?;
//! ```
//!
//! Table modules expose plain `async fn(pool, ...)` operations; [`Database`]
//! implements the `vigil-issues` store traits on top of them so the engines
//! never see SQL.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod codec;
pub mod connection;
pub mod error;
pub mod issues;
pub mod migrations;
pub mod runs;
mod store;
pub mod suppressions;
pub mod trends;

pub use error::{DatabaseError, Result};

use sqlx::{Pool, Sqlite};
use std::path::Path;

/// High-level database handle.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (creating if needed) the database at `path`, or an in-memory
    /// database for `:memory:`.
    ///
    /// # Errors
    /// Returns `DatabaseError::Open` if the database cannot be opened.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::connect(path).await?;
        Ok(Self { pool })
    }

    /// Open and migrate in one step.
    ///
    /// # Errors
    /// Returns `DatabaseError` if opening or migrating fails.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Self::new(path).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get the current schema version.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the version cannot be queried.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
