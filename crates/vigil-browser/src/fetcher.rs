//! The fetcher capability the crawl and verification engines consume.

use crate::error::Result;
use crate::page::FetchedPage;
use url::Url;
use vigil_core::DomainConfig;

/// Fetches pages for one domain crawl.
///
/// A fetcher is acquired from a [`FetcherFactory`] at the start of a domain
/// crawl and must be closed by the caller on every exit path.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a single URL without following redirects.
    async fn fetch(&self, url: &Url) -> Result<FetchedPage>;

    /// Release resources held by the fetcher (browser processes, pools).
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Acquires a fresh fetcher scoped to one domain crawl.
#[async_trait::async_trait]
pub trait FetcherFactory: Send + Sync {
    /// Open a fetcher for `domain`.
    async fn open(&self, domain: &DomainConfig) -> Result<Box<dyn PageFetcher>>;
}
