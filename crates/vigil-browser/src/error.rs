//! Page fetching error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("fetcher closed")]
    Closed,
}

impl From<reqwest::Error> for BrowserError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}
