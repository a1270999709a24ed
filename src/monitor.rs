use std::path::Path;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::{
    change::{PriceChange, percent_change},
    config::{MonitorConfig, UNKNOWN_PRODUCT},
    fetch::{FetchError, PageFetcher},
    price::{ParseError, parse_price},
    store::{HistoryEntry, PriceStore, StoreError},
};

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn read_links(path: &Path) -> std::io::Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub struct Monitor<F> {
    fetcher: F,
    store: PriceStore,
    config: MonitorConfig,
}

impl<F: PageFetcher> Monitor<F> {
    pub fn new(fetcher: F, store: PriceStore, config: MonitorConfig) -> Self {
        Self {
            fetcher,
            store,
            config,
        }
    }

    /// Hands the fetcher back so the caller can release it.
    pub fn into_fetcher(self) -> F {
        self.fetcher
    }

    pub async fn process_all_links(&mut self, links: &[String]) {
        println!("Found {} links to process", links.len());

        for url in links {
            println!("\n🔍 Processing: {url}");
            match self.check_product(url).await {
                Ok((name, current, change)) => println!("{}", change.report(&name, current)),
                Err(CheckError::Fetch(e)) => error!("failed to load price from {}: {}", url, e),
                Err(CheckError::Parse(e)) => warn!("skipping {}: {}", url, e),
                Err(CheckError::Store(e)) => error!("failed to store price for {}: {}", url, e),
            }

            self.show_price_history(url);
            sleep(self.config.delay_between_links).await;
        }
    }

    async fn check_product(&mut self, url: &str) -> Result<(String, f64, PriceChange), CheckError> {
        self.fetcher.navigate(url).await?;
        let price_text = self
            .fetcher
            .wait_for_text(&self.config.price_selector, self.config.element_timeout)
            .await?;
        info!("found price text {:?} on {}", price_text, url);

        let current = parse_price(&price_text)?;
        let name = self.product_name().await;
        let previous = self.store.record_observation(url, &name, current)?;

        Ok((name, current, PriceChange::classify(current, previous)))
    }

    async fn product_name(&mut self) -> String {
        for selector in &self.config.name_selectors {
            match self.fetcher.element_text(selector).await {
                Ok(text) if !text.trim().is_empty() => return text.trim().to_string(),
                Ok(_) => debug!("name selector {} matched empty text", selector),
                Err(e) => debug!("name selector {} failed: {}", selector, e),
            }
        }
        UNKNOWN_PRODUCT.to_string()
    }

    fn show_price_history(&self, url: &str) {
        match self.store.history(url, self.config.history_limit) {
            Ok(history) => println!("{}", format_history(url, &history)),
            Err(e) => error!("failed to read price history for {}: {}", url, e),
        }
    }
}

fn format_history(url: &str, history: &[HistoryEntry]) -> String {
    if history.is_empty() {
        return format!("No price history found for {url}");
    }

    let mut out = format!("\n📈 Price history for {url}:");
    for entry in history {
        let change = entry
            .previous_price
            .and_then(|previous| percent_change(entry.current_price, previous))
            .map(|percent| format!(" ({percent:+.1}%)"))
            .unwrap_or_default();
        out.push_str(&format!(
            "\n  {}: {}{}",
            entry.check_date.format("%Y-%m-%d %H:%M:%S"),
            entry.current_price,
            change
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashMap, time::Duration};

    #[derive(Default)]
    struct Page {
        elements: HashMap<String, String>,
    }

    /// Serves canned pages; URLs without a page fail to load.
    #[derive(Default)]
    struct ScriptedFetcher {
        pages: HashMap<String, Page>,
        current: Option<String>,
        visited: Vec<String>,
    }

    impl ScriptedFetcher {
        fn page(mut self, url: &str, elements: &[(&str, &str)]) -> Self {
            let elements = elements
                .iter()
                .map(|(selector, text)| (selector.to_string(), text.to_string()))
                .collect();
            self.pages.insert(url.to_string(), Page { elements });
            self
        }

        fn lookup(&self, selector: &str) -> Result<String, FetchError> {
            let url = self.current.as_ref().ok_or(FetchError::NoPage)?;
            self.pages[url]
                .elements
                .get(selector)
                .cloned()
                .ok_or_else(|| FetchError::ElementNotFound(selector.to_string()))
        }
    }

    impl PageFetcher for ScriptedFetcher {
        async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
            self.visited.push(url.to_string());
            if !self.pages.contains_key(url) {
                self.current = None;
                return Err(FetchError::ElementNotFound("body".to_string()));
            }
            self.current = Some(url.to_string());
            Ok(())
        }

        async fn wait_for_text(
            &mut self,
            selector: &str,
            timeout: Duration,
        ) -> Result<String, FetchError> {
            self.lookup(selector).map_err(|_| FetchError::Timeout {
                selector: selector.to_string(),
                timeout,
            })
        }

        async fn element_text(&mut self, selector: &str) -> Result<String, FetchError> {
            self.lookup(selector)
        }

        async fn close(self) -> Result<(), FetchError> {
            Ok(())
        }
    }

    fn test_config() -> MonitorConfig {
        MonitorConfig {
            price_selector: "#price".to_string(),
            name_selectors: vec!["#title".to_string(), "h1".to_string()],
            delay_between_links: Duration::ZERO,
            ..MonitorConfig::default()
        }
    }

    fn links(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn failing_link_does_not_stop_the_batch() {
        let fetcher = ScriptedFetcher::default()
            .page("https://a", &[("#price", "100 ₽"), ("#title", "A")])
            .page("https://c", &[("#price", "300 ₽"), ("#title", "C")]);
        let store = PriceStore::open_in_memory().unwrap();
        let mut monitor = Monitor::new(fetcher, store, test_config());

        monitor
            .process_all_links(&links(&["https://a", "https://b", "https://c"]))
            .await;

        assert_eq!(monitor.store.history("https://a", 10).unwrap().len(), 1);
        assert!(monitor.store.history("https://b", 10).unwrap().is_empty());
        assert_eq!(
            monitor.store.history("https://c", 10).unwrap()[0].current_price,
            300.0
        );
        assert_eq!(monitor.fetcher.visited.len(), 3);
    }

    #[tokio::test]
    async fn unparsable_price_is_not_stored() {
        let fetcher = ScriptedFetcher::default()
            .page("https://a", &[("#price", "Цена по запросу"), ("#title", "A")]);
        let store = PriceStore::open_in_memory().unwrap();
        let mut monitor = Monitor::new(fetcher, store, test_config());

        let err = monitor.check_product("https://a").await.unwrap_err();
        assert!(matches!(err, CheckError::Parse(_)));
        assert!(monitor.store.history("https://a", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_check_compares_with_stored_price() {
        let fetcher = ScriptedFetcher::default().page("https://a", &[("#price", "1 000 ₽")]);
        let store = PriceStore::open_in_memory().unwrap();
        let mut monitor = Monitor::new(fetcher, store, test_config());

        let (_, _, first) = monitor.check_product("https://a").await.unwrap();
        assert_eq!(first, PriceChange::New);

        monitor
            .fetcher
            .pages
            .get_mut("https://a")
            .unwrap()
            .elements
            .insert("#price".to_string(), "450 ₽".to_string());
        let (_, current, second) = monitor.check_product("https://a").await.unwrap();
        assert_eq!(current, 450.0);
        assert_eq!(second, PriceChange::HalvedOrBelow { previous: 1000.0 });
    }

    #[tokio::test]
    async fn name_falls_back_through_selectors() {
        let fetcher = ScriptedFetcher::default()
            .page("https://a", &[("#price", "10"), ("#title", "   "), ("h1", " Kettle ")])
            .page("https://b", &[("#price", "10")]);
        let store = PriceStore::open_in_memory().unwrap();
        let mut monitor = Monitor::new(fetcher, store, test_config());

        let (name, _, _) = monitor.check_product("https://a").await.unwrap();
        assert_eq!(name, "Kettle");
        let (name, _, _) = monitor.check_product("https://b").await.unwrap();
        assert_eq!(name, UNKNOWN_PRODUCT);
    }

    #[tokio::test]
    async fn reads_non_blank_links() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("links.txt");
        tokio::fs::write(&path, "https://a\n\n   \n https://b \n")
            .await
            .unwrap();

        assert_eq!(read_links(&path).await.unwrap(), links(&["https://a", "https://b"]));
    }

    #[test]
    fn history_block_shows_percent_change() {
        let check_date = chrono::DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let history = [
            HistoryEntry {
                check_date,
                current_price: 80.0,
                previous_price: Some(100.0),
            },
            HistoryEntry {
                check_date,
                current_price: 100.0,
                previous_price: None,
            },
        ];

        let block = format_history("https://a", &history);
        assert!(block.contains("📈 Price history for https://a:"));
        assert!(block.contains("  2024-05-01 10:00:00: 80 (-20.0%)"));
        assert!(block.ends_with("  2024-05-01 10:00:00: 100"));
        assert_eq!(format_history("https://a", &[]), "No price history found for https://a");

        let free_before = [HistoryEntry {
            check_date,
            current_price: 10.0,
            previous_price: Some(0.0),
        }];
        assert!(format_history("https://a", &free_before).ends_with("  2024-05-01 10:00:00: 10"));
    }
}
