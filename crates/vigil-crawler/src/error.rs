//! Crawl, verification and run error types.

use thiserror::Error;
use vigil_browser::BrowserError;
use vigil_core::ConfigError;
use vigil_issues::StoreError;

/// Errors that stop a crawl, verification pass or run from starting.
///
/// Failures during traversal (fetches, check modules, store writes) are not
/// errors; they surface as findings or are counted on the run.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Domain configuration unusable (e.g. unparsable root URL)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Page fetcher could not be acquired
    #[error("fetcher error: {0}")]
    Fetcher(#[from] BrowserError),

    /// Issue store read failed where the data is required
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for crawler operations.
pub type Result<T> = std::result::Result<T, CrawlError>;
