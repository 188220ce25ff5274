//! Small helpers over `scraper` shared by the HTML-inspecting modules.

use crate::error::{CheckError, Result};
use scraper::{ElementRef, Html, Selector};

/// Parse a CSS selector, mapping failures to [`CheckError::Parse`].
pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| CheckError::Parse(format!("invalid selector {css}: {e}")))
}

/// First element matching `css`.
pub(crate) fn first<'a>(document: &'a Html, css: &str) -> Result<Option<ElementRef<'a>>> {
    Ok(document.select(&selector(css)?).next())
}

/// Number of elements matching `css`.
pub(crate) fn count(document: &Html, css: &str) -> Result<usize> {
    Ok(document.select(&selector(css)?).count())
}

/// Whitespace-normalised text content of an element.
pub(crate) fn text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Outer HTML of an element, truncated for use as evidence.
pub(crate) fn snippet(element: ElementRef<'_>) -> String {
    const MAX: usize = 160;
    let html = element.html();
    if html.chars().count() <= MAX {
        html
    } else {
        let cut: String = html.chars().take(MAX).collect();
        format!("{cut}…")
    }
}
