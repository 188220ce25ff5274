//! Page fetching for site audits.
//!
//! Provides the [`PageFetcher`] capability consumed by the crawl and
//! verification engines: a raw HTTP fetcher and a headless-browser
//! fetcher that renders script-driven pages. Fetchers are acquired per
//! domain crawl through a [`FetcherFactory`] and closed when the crawl ends.

pub mod engine;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod links;
pub mod page;

use std::sync::Arc;
use vigil_core::FetchConfig;

pub use engine::{BrowserEngine, RenderingFetcher, RenderingFetcherFactory};
pub use error::{BrowserError, Result};
pub use fetcher::{FetcherFactory, PageFetcher};
pub use http::{HttpFetcher, HttpFetcherFactory};
pub use links::{extract_links, resolve_href};
pub use page::{route_of, FetchedPage};

/// Pick the fetcher factory the configuration asks for.
#[must_use]
pub fn factory_from_config(config: &FetchConfig) -> Arc<dyn FetcherFactory> {
    if config.render {
        Arc::new(RenderingFetcherFactory::new(config.clone()))
    } else {
        Arc::new(HttpFetcherFactory::new(config.clone()))
    }
}
