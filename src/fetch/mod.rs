mod http;
mod webdriver;

use std::time::Duration;

use thiserror::Error;

pub use http::HttpFetcher;
pub use webdriver::WebDriverFetcher;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webdriver command failed: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),
    #[error("invalid selector {0:?}")]
    InvalidSelector(String),
    #[error("element {selector:?} not visible after {timeout:?}")]
    Timeout { selector: String, timeout: Duration },
    #[error("element {0:?} not found")]
    ElementNotFound(String),
    #[error("no page loaded")]
    NoPage,
}

/// A single browsing session that loads product pages and reads element text.
///
/// The session is owned by whoever drives it and must be released with
/// [`PageFetcher::close`] once the run is over.
pub trait PageFetcher {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError>;

    /// Waits until `selector` matches a visible element and returns its text.
    async fn wait_for_text(&mut self, selector: &str, timeout: Duration)
    -> Result<String, FetchError>;

    /// Text of the first element matching `selector` on the current page.
    async fn element_text(&mut self, selector: &str) -> Result<String, FetchError>;

    async fn close(self) -> Result<(), FetchError>;
}
