use std::{path::PathBuf, time::Duration};

pub const LINKS_FILE: &str = "links.txt";
pub const DB_PATH: &str = "prices.db";
pub const LOG_FILE: &str = "price_monitor.log";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
pub const UNKNOWN_PRODUCT: &str = "Unknown product";

pub const PRICE_SELECTOR: &str = "h2[class*='mo-typography mo-typography_variant_title2']";
pub const NAME_SELECTORS: [&str; 5] = [
    "h1.product-page__title",
    ".product-page__header",
    "[data-tag='productName']",
    "h1",
    ".product-name",
];

pub struct MonitorConfig {
    pub links_file: PathBuf,
    pub db_path: PathBuf,
    pub log_file: PathBuf,
    pub user_agent: String,
    pub price_selector: String,
    /// Tried in order; the first one yielding non-empty text names the product.
    pub name_selectors: Vec<String>,
    pub element_timeout: Duration,
    /// Upper bound for a single HTTP request.
    pub request_timeout: Duration,
    /// How often the HTTP fetcher re-downloads a page still missing the price.
    pub reload_interval: Duration,
    /// How often the WebDriver fetcher re-checks element visibility.
    pub poll_interval: Duration,
    pub settle_delay: Duration,
    pub delay_between_links: Duration,
    pub history_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            links_file: PathBuf::from(LINKS_FILE),
            db_path: PathBuf::from(DB_PATH),
            log_file: PathBuf::from(LOG_FILE),
            user_agent: USER_AGENT.to_string(),
            price_selector: PRICE_SELECTOR.to_string(),
            name_selectors: NAME_SELECTORS.iter().map(|s| s.to_string()).collect(),
            element_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            reload_interval: Duration::from_secs(4),
            poll_interval: Duration::from_millis(500),
            settle_delay: Duration::from_secs(3),
            delay_between_links: Duration::from_secs(2),
            history_limit: 10,
        }
    }
}
