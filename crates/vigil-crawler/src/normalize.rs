//! URL identity for the visited set.

use url::{form_urlencoded, Url};

/// Visited-set key: scheme, host, port, path and sorted query pairs.
///
/// Query pairs are decoded, sorted and encoded again, so escaped
/// separators inside a value stay escaped. The fragment is dropped and an
/// empty path becomes `/`, so
/// `https://Example.com?b=2&a=1#top` and `https://example.com/?a=1&b=2`
/// share a key.
#[must_use]
pub fn normalize(url: &Url) -> String {
    let mut key = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }

    let path = url.path();
    key.push_str(if path.is_empty() { "/" } else { path });

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !pairs.is_empty() {
        pairs.sort();
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&pairs)
            .finish();
        key.push('?');
        key.push_str(&query);
    }

    key
}

/// Same scheme, host and port.
#[must_use]
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_normalize_equivalent_urls() {
        assert_eq!(
            normalize(&url("https://Example.com?b=2&a=1#top")),
            normalize(&url("https://example.com/?a=1&b=2"))
        );
        assert_eq!(
            normalize(&url("https://example.com:443/about")),
            "https://example.com/about"
        );
    }

    #[test]
    fn test_normalize_keeps_distinct_urls_apart() {
        assert_ne!(
            normalize(&url("https://example.com/a")),
            normalize(&url("https://example.com/a/"))
        );
        assert_ne!(
            normalize(&url("http://example.com/")),
            normalize(&url("https://example.com/"))
        );
        assert_ne!(
            normalize(&url("https://example.com/?page=1")),
            normalize(&url("https://example.com/?page=2"))
        );
        assert_eq!(
            normalize(&url("https://example.com:8443/")),
            "https://example.com:8443/"
        );
    }

    #[test]
    fn test_normalize_keeps_escaped_separators() {
        let single = normalize(&url("https://example.com/s?a=1%26b%3D2"));
        let pair = normalize(&url("https://example.com/s?a=1&b=2"));
        assert_ne!(single, pair);
        assert_eq!(pair, "https://example.com/s?a=1&b=2");
        assert_eq!(single, "https://example.com/s?a=1%26b%3D2");
    }

    #[test]
    fn test_same_origin() {
        let root = url("https://example.com/");
        assert!(same_origin(&root, &url("https://example.com/deep/page?x=1")));
        assert!(!same_origin(&root, &url("http://example.com/")));
        assert!(!same_origin(&root, &url("https://cdn.example.com/")));
        assert!(!same_origin(&root, &url("https://example.com:8443/")));
    }
}
