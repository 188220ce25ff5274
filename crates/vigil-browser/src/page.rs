//! The fetched page handed to check modules.

use crate::links::extract_links;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// A single fetch result. Redirects are not followed by fetchers: a 3xx
/// response comes back as-is with its `location` header so the caller can
/// enforce its own hop limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    /// URL that was requested
    pub url: Url,
    /// HTTP status code of the response
    pub status: u16,
    /// Response headers, names lowercased, repeated values joined with `, `
    pub headers: BTreeMap<String, String>,
    /// Response body (rendered DOM when `rendered` is set)
    pub body: String,
    /// Size of the raw response body in bytes
    pub body_bytes: usize,
    /// Absolute outbound web links found in the page
    pub links: Vec<Url>,
    /// Time from request start to full body
    pub elapsed: Duration,
    /// Uncaught script exceptions thrown while the page rendered
    pub runtime_errors: Vec<String>,
    /// Headless rendering failure; `body` is then the raw response
    #[serde(default)]
    pub render_error: Option<String>,
    /// Whether `body` and `links` come from a headless browser
    pub rendered: bool,
}

impl FetchedPage {
    /// Empty response with the given status.
    #[must_use]
    pub fn new(url: Url, status: u16) -> Self {
        Self {
            url,
            status,
            headers: BTreeMap::new(),
            body: String::new(),
            body_bytes: 0,
            links: Vec::new(),
            elapsed: Duration::ZERO,
            runtime_errors: Vec::new(),
            render_error: None,
            rendered: false,
        }
    }

    /// HTML response; links are extracted from the body.
    #[must_use]
    pub fn html(url: Url, status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let links = extract_links(&body, &url);
        let mut page = Self::new(url, status).with_header("content-type", "text/html; charset=utf-8");
        page.body_bytes = body.len();
        page.body = body;
        page.links = links;
        page
    }

    /// Redirect response pointing at `location`.
    #[must_use]
    pub fn redirect(url: Url, status: u16, location: &str) -> Self {
        Self::new(url, status).with_header("location", location)
    }

    /// Add or replace a header (name is lowercased).
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Set the measured fetch time.
    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Header lookup, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 3xx status with a usable `location` header.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status) && self.location().is_some()
    }

    /// Redirect target resolved against the request URL.
    #[must_use]
    pub fn location(&self) -> Option<Url> {
        self.header("location")
            .and_then(|loc| self.url.join(loc.trim()).ok())
    }

    /// Media type without parameters, lowercased.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type").map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// HTML (or unknown content type with a body that looks like markup).
    #[must_use]
    pub fn is_html(&self) -> bool {
        match self.content_type() {
            Some(ct) => ct == "text/html" || ct == "application/xhtml+xml",
            None => self.body.trim_start().starts_with('<'),
        }
    }

    /// Route of the page: its path (always starting with `/`).
    #[must_use]
    pub fn route(&self) -> String {
        route_of(&self.url)
    }
}

/// Route of a URL: its path, `/` when empty.
#[must_use]
pub fn route_of(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}
