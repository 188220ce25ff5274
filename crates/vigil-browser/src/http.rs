//! Plain HTTP fetching with reqwest.

use crate::error::{BrowserError, Result};
use crate::fetcher::{FetcherFactory, PageFetcher};
use crate::links::extract_links;
use crate::page::FetchedPage;
use reqwest::header::HeaderMap;
use std::collections::BTreeMap;
use std::time::Instant;
use url::Url;
use vigil_core::{DomainConfig, FetchConfig};

/// Fetches raw HTTP responses. Redirects are returned, not followed.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with the configured user agent and timeout.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| BrowserError::Http(format!("failed to build client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let started = Instant::now();
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let bytes = response.bytes().await?;
        let elapsed = started.elapsed();

        let mut page = FetchedPage::new(url.clone(), status).with_elapsed(elapsed);
        page.headers = headers;
        page.body_bytes = bytes.len();
        page.body = String::from_utf8_lossy(&bytes).into_owned();

        if page.is_success() && page.is_html() {
            page.links = extract_links(&page.body, url);
        }

        tracing::debug!(
            url = %url,
            status,
            bytes = page.body_bytes,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "fetched"
        );

        Ok(page)
    }
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

/// Opens one [`HttpFetcher`] (and connection pool) per domain crawl.
pub struct HttpFetcherFactory {
    config: FetchConfig,
}

impl HttpFetcherFactory {
    /// Create a factory from the fetch settings.
    #[must_use]
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl FetcherFactory for HttpFetcherFactory {
    async fn open(&self, domain: &DomainConfig) -> Result<Box<dyn PageFetcher>> {
        tracing::debug!(domain = %domain.id(), "opening http fetcher");
        Ok(Box::new(HttpFetcher::new(&self.config)?))
    }
}
