//! Headless Chromium rendering and the fetcher built on it.

use crate::error::{BrowserError, Result};
use crate::fetcher::{FetcherFactory, PageFetcher};
use crate::http::HttpFetcher;
use crate::links::resolve_href;
use crate::page::FetchedPage;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::{EventExceptionThrown, ExceptionDetails};
use futures::future::FutureExt;
use futures::stream::StreamExt;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use url::Url;
use vigil_core::{DomainConfig, FetchConfig};

const COLLECT_LINKS_JS: &str =
    "Array.from(document.querySelectorAll('a[href]')).map(a => a.getAttribute('href'))";

/// DOM snapshot of a page after scripts ran.
#[derive(Debug, Clone)]
pub struct RenderedDom {
    /// Serialized document
    pub html: String,
    /// Raw href attribute values, unresolved
    pub hrefs: Vec<String>,
    /// Uncaught exceptions thrown by page scripts
    pub script_errors: Vec<String>,
}

/// One line per uncaught exception: the thrown value's description when
/// there is one, the console text otherwise.
fn exception_message(details: &ExceptionDetails) -> String {
    let description = details
        .exception
        .as_ref()
        .and_then(|thrown| thrown.description.as_deref());
    describe_exception(&details.text, description)
}

fn describe_exception(text: &str, description: Option<&str>) -> String {
    description
        .map(|d| d.lines().next().unwrap_or(d))
        .filter(|d| !d.is_empty())
        .unwrap_or(text)
        .to_string()
}

/// Headless Chromium instance owned by a single domain crawl.
pub struct BrowserEngine {
    browser: RwLock<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    navigation_timeout: Duration,
}

impl BrowserEngine {
    /// Launch a browser with the configured window mode.
    pub async fn launch(config: &FetchConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1920, 1080)
            .request_timeout(config.request_timeout());
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Drive the CDP connection until the browser goes away
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: RwLock::new(Some(browser)),
            handler: Mutex::new(Some(handler_task)),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
        })
    }

    /// Load `url` in a fresh tab and snapshot the DOM.
    ///
    /// Exceptions are collected from before navigation starts until the
    /// snapshot is taken.
    pub async fn render(&self, url: &Url) -> Result<RenderedDom> {
        let guard = self.browser.read().await;
        let browser = guard.as_ref().ok_or(BrowserError::Closed)?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        let snapshot = tokio::time::timeout(self.navigation_timeout, async {
            let mut exceptions = page
                .event_listener::<EventExceptionThrown>()
                .await
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
            page.goto(url.as_str())
                .await
                .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
            let html = page
                .content()
                .await
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
            let hrefs: Vec<String> = page
                .evaluate(COLLECT_LINKS_JS)
                .await
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))?
                .into_value()
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

            let mut script_errors = Vec::new();
            while let Some(Some(event)) = exceptions.next().now_or_never() {
                script_errors.push(exception_message(&event.exception_details));
            }

            Ok::<_, BrowserError>(RenderedDom {
                html,
                hrefs,
                script_errors,
            })
        })
        .await;

        if let Err(e) = page.close().await {
            tracing::debug!(url = %url, "failed to close tab: {}", e);
        }

        snapshot.map_err(|_| BrowserError::Timeout(url.to_string()))?
    }

    /// Shut the browser down. Safe to call more than once.
    pub async fn close(&self) -> Result<()> {
        let browser = self.browser.write().await.take();
        let result = match browser {
            Some(mut browser) => {
                let closed = browser
                    .close()
                    .await
                    .map(|_| ())
                    .map_err(|e| BrowserError::ChromiumError(e.to_string()));
                if let Err(e) = browser.wait().await {
                    tracing::debug!("browser process wait failed: {}", e);
                }
                closed
            }
            None => Ok(()),
        };

        if let Some(task) = self.handler.lock().await.take() {
            task.abort();
        }

        result
    }
}

/// Raw HTTP for status and headers, headless rendering for the DOM.
///
/// A rendering failure does not fail the fetch: the raw body is kept and the
/// failure is recorded in `render_error`. Uncaught script exceptions of a
/// rendered page land in `runtime_errors`.
pub struct RenderingFetcher {
    http: HttpFetcher,
    engine: BrowserEngine,
}

impl RenderingFetcher {
    /// Launch a browser and pair it with an HTTP client.
    pub async fn launch(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new(config)?,
            engine: BrowserEngine::launch(config).await?,
        })
    }
}

#[async_trait::async_trait]
impl PageFetcher for RenderingFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let mut page = self.http.fetch(url).await?;
        if !(page.is_success() && page.is_html()) {
            return Ok(page);
        }

        match self.engine.render(url).await {
            Ok(dom) => {
                let mut seen = HashSet::new();
                page.links = dom
                    .hrefs
                    .iter()
                    .filter_map(|href| resolve_href(url, href))
                    .filter(|link| seen.insert(link.as_str().to_string()))
                    .collect();
                page.body = dom.html;
                page.runtime_errors = dom.script_errors;
                page.rendered = true;
            }
            Err(e) => {
                tracing::warn!(url = %url, "render failed, using raw response: {}", e);
                page.render_error = Some(e.to_string());
            }
        }

        Ok(page)
    }

    async fn close(&self) -> Result<()> {
        self.engine.close().await
    }
}

/// Launches one browser per domain crawl.
pub struct RenderingFetcherFactory {
    config: FetchConfig,
}

impl RenderingFetcherFactory {
    /// Create a factory from the fetch settings.
    #[must_use]
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl FetcherFactory for RenderingFetcherFactory {
    async fn open(&self, domain: &DomainConfig) -> Result<Box<dyn PageFetcher>> {
        tracing::info!(domain = %domain.id(), "launching browser");
        Ok(Box::new(RenderingFetcher::launch(&self.config).await?))
    }
}
