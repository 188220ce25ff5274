//! Outbound link extraction from HTML.

use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

fn anchor_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("a[href]").expect("valid selector"))
}

/// Extract absolute `http`/`https` link targets from an HTML document.
///
/// Relative hrefs are resolved against `base` (or the document's
/// `<base href>` when present). Fragments are dropped, duplicates removed,
/// and document order preserved.
#[must_use]
pub fn extract_links(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let base = document_base(&document, base);

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(anchor_selector()) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if let Some(url) = resolve_href(&base, href) {
            if seen.insert(url.as_str().to_string()) {
                links.push(url);
            }
        }
    }

    links
}

/// Resolve a raw href against a base URL, keeping only web links.
#[must_use]
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

fn document_base(document: &Html, fallback: &Url) -> Url {
    static BASE: OnceLock<Selector> = OnceLock::new();
    let selector = BASE.get_or_init(|| Selector::parse("base[href]").expect("valid selector"));

    document
        .select(selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| fallback.join(href).ok())
        .unwrap_or_else(|| fallback.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/docs/index.html").unwrap()
    }

    #[test]
    fn test_extract_resolves_relative_links() {
        let html = r##"
            <a href="/about">About</a>
            <a href="guide.html#intro">Guide</a>
            <a href="https://other.example.org/x">Other</a>
        "##;
        let links: Vec<String> = extract_links(html, &base())
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/about",
                "https://example.com/docs/guide.html",
                "https://other.example.org/x",
            ]
        );
    }

    #[test]
    fn test_extract_skips_non_web_and_fragment_links() {
        let html = r##"
            <a href="mailto:hi@example.com">Mail</a>
            <a href="javascript:void(0)">JS</a>
            <a href="#top">Top</a>
            <a href="">Empty</a>
            <a href="tel:+100">Call</a>
        "##;
        assert!(extract_links(html, &base()).is_empty());
    }

    #[test]
    fn test_extract_deduplicates() {
        let html = r#"<a href="/a">1</a><a href="/a#x">2</a><a href="/a">3</a>"#;
        assert_eq!(extract_links(html, &base()).len(), 1);
    }

    #[test]
    fn test_base_href_respected() {
        let html = r#"<html><head><base href="https://example.com/v2/"></head>
                      <body><a href="page">p</a></body></html>"#;
        let links = extract_links(html, &base());
        assert_eq!(links[0].as_str(), "https://example.com/v2/page");
    }
}
