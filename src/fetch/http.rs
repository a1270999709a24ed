use std::time::Duration;

use scraper::{Html, Selector};
use tokio::time::{Instant, sleep, timeout as time_limit};
use tracing::debug;

use super::{FetchError, PageFetcher};

/// Fetches pages over plain HTTP and queries them with CSS selectors.
///
/// Scripts never run, so "visible" means the selector matches an element with
/// non-empty text. Until that happens the page is re-requested every
/// `reload_interval`, as long as the next attempt still fits the wait.
pub struct HttpFetcher {
    client: reqwest::Client,
    reload_interval: Duration,
    url: Option<String>,
    body: Option<String>,
}

impl HttpFetcher {
    pub fn new(
        user_agent: &str,
        request_timeout: Duration,
        reload_interval: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            reload_interval,
            url: None,
            body: None,
        })
    }

    async fn load(&self, url: &str) -> Result<String, FetchError> {
        let res = self
            .client
            .get(url)
            .header("Accept-Language", "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7")
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .send()
            .await?
            .error_for_status()?;
        Ok(res.text().await?)
    }
}

fn parse_selector(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector).map_err(|_| FetchError::InvalidSelector(selector.to_string()))
}

fn select_text(body: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(body);
    document
        .select(selector)
        .map(|element| element.text().collect::<Vec<_>>().join(" "))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|text| !text.is_empty())
}

impl PageFetcher for HttpFetcher {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        self.body = None;
        self.url = Some(url.to_string());
        self.body = Some(self.load(url).await?);
        Ok(())
    }

    async fn wait_for_text(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<String, FetchError> {
        let parsed = parse_selector(selector)?;
        let url = self.url.clone().ok_or(FetchError::NoPage)?;
        let deadline = Instant::now() + timeout;

        let timed_out = || FetchError::Timeout {
            selector: selector.to_string(),
            timeout,
        };

        loop {
            let body = self.body.as_deref().ok_or(FetchError::NoPage)?;
            if let Some(text) = select_text(body, &parsed) {
                return Ok(text);
            }
            if Instant::now() + self.reload_interval >= deadline {
                return Err(timed_out());
            }
            debug!("{} not on {} yet, reloading", selector, url);
            sleep(self.reload_interval).await;

            let remaining = deadline.saturating_duration_since(Instant::now());
            let body = time_limit(remaining, self.load(&url))
                .await
                .map_err(|_| timed_out())??;
            self.body = Some(body);
        }
    }

    async fn element_text(&mut self, selector: &str) -> Result<String, FetchError> {
        let parsed = parse_selector(selector)?;
        let body = self.body.as_deref().ok_or(FetchError::NoPage)?;
        select_text(body, &parsed).ok_or_else(|| FetchError::ElementNotFound(selector.to_string()))
    }

    async fn close(self) -> Result<(), FetchError> {
        Ok(())
    }
}
