//! Scripted fetchers: canned responses per URL, no network.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;
use vigil_browser::{BrowserError, FetchedPage, FetcherFactory, PageFetcher};
use vigil_core::DomainConfig;

pub const SHOP: &str = "https://shop.example.com/";

/// The shop's home page. Apart from the optional title and HSTS header it
/// passes every built-in check.
pub fn storefront(title: bool, hsts: bool) -> FetchedPage {
    let title = if title { "<title>Shop</title>" } else { "" };
    let body = format!(
        r#"<html lang="en"><head>{title}
<meta name="description" content="Everything for the garden">
<link rel="canonical" href="https://shop.example.com/">
</head><body><h1>Shop</h1></body></html>"#
    );
    let page = FetchedPage::html(Url::parse(SHOP).unwrap(), 200, body)
        .with_header("content-security-policy", "default-src 'self'")
        .with_header("x-content-type-options", "nosniff")
        .with_header("x-frame-options", "DENY")
        .with_header("referrer-policy", "no-referrer");
    if hsts {
        page.with_header("strict-transport-security", "max-age=63072000")
    } else {
        page
    }
}

#[derive(Clone)]
enum Response {
    Page(FetchedPage),
    Fail(String),
}

/// Responses and observations shared by every fetcher a factory opens.
#[derive(Default)]
pub struct Site {
    responses: Mutex<HashMap<String, Response>>,
    calls: Mutex<Vec<Url>>,
    starts: Mutex<Vec<Instant>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Mutex<Duration>,
}

impl Site {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// HTML page with all security headers set.
    pub fn page(&self, url: &str, body: &str) {
        let page = FetchedPage::html(Url::parse(url).unwrap(), 200, body)
            .with_header("strict-transport-security", "max-age=63072000")
            .with_header("content-security-policy", "default-src 'self'")
            .with_header("x-content-type-options", "nosniff")
            .with_header("x-frame-options", "DENY")
            .with_header("referrer-policy", "no-referrer");
        self.respond(url, page);
    }

    pub fn respond(&self, url: &str, page: FetchedPage) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Response::Page(page));
    }

    pub fn redirect(&self, from: &str, to: &str) {
        self.respond(from, FetchedPage::redirect(Url::parse(from).unwrap(), 301, to));
    }

    pub fn fail(&self, url: &str, error: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Response::Fail(error.to_string()));
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Requested path and query, in request order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|u| u[url::Position::BeforePath..].to_string())
            .collect()
    }

    /// When each fetch started.
    pub fn starts(&self) -> Vec<Instant> {
        self.starts.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

pub struct ScriptedFetcher {
    site: Arc<Site>,
    closed: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url) -> vigil_browser::Result<FetchedPage> {
        self.site.calls.lock().unwrap().push(url.clone());
        self.site.starts.lock().unwrap().push(Instant::now());
        let now = self.site.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.site.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = *self.site.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let response = self
            .site
            .responses
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned();
        self.site.in_flight.fetch_sub(1, Ordering::SeqCst);

        match response {
            Some(Response::Page(page)) => Ok(page),
            Some(Response::Fail(error)) => Err(BrowserError::Http(error)),
            None => Ok(FetchedPage::new(url.clone(), 404)),
        }
    }

    async fn close(&self) -> vigil_browser::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory handing out fetchers over one scripted site.
pub struct ScriptedFactory {
    pub site: Arc<Site>,
    pub opened: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
    pub fail_open: bool,
}

impl ScriptedFactory {
    pub fn new(site: Arc<Site>) -> Self {
        Self {
            site,
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
            fail_open: false,
        }
    }

    pub fn failing(site: Arc<Site>) -> Self {
        Self {
            fail_open: true,
            ..Self::new(site)
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FetcherFactory for ScriptedFactory {
    async fn open(&self, _domain: &DomainConfig) -> vigil_browser::Result<Box<dyn PageFetcher>> {
        if self.fail_open {
            return Err(BrowserError::ChromiumError("browser failed to launch".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedFetcher {
            site: Arc::clone(&self.site),
            closed: Arc::clone(&self.closed),
        }))
    }
}
