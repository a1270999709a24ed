use std::time::Duration;

use thirtyfour::prelude::*;
use tokio::time::sleep;
use tracing::info;

use super::{FetchError, PageFetcher};

/// Drives a real Chrome through a WebDriver server such as chromedriver.
pub struct WebDriverFetcher {
    driver: WebDriver,
    poll_interval: Duration,
    settle_delay: Duration,
}

impl WebDriverFetcher {
    pub async fn connect(
        server_url: &str,
        user_agent: &str,
        poll_interval: Duration,
        settle_delay: Duration,
    ) -> Result<Self, FetchError> {
        let mut caps = DesiredCapabilities::chrome();
        caps.add_arg("--no-sandbox")?;
        caps.add_arg("--disable-dev-shm-usage")?;
        caps.add_arg(&format!("--user-agent={user_agent}"))?;

        let driver = WebDriver::new(server_url, caps).await?;
        info!("connected to webdriver at {}", server_url);
        Ok(Self {
            driver,
            poll_interval,
            settle_delay,
        })
    }
}

impl PageFetcher for WebDriverFetcher {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        self.driver.goto(url).await?;
        self.driver.fullscreen_window().await?;
        sleep(self.settle_delay).await;
        Ok(())
    }

    async fn wait_for_text(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<String, FetchError> {
        let element = self
            .driver
            .query(By::Css(selector))
            .wait(timeout, self.poll_interval)
            .and_displayed()
            .first()
            .await?;
        Ok(element.text().await?)
    }

    async fn element_text(&mut self, selector: &str) -> Result<String, FetchError> {
        let element = self.driver.find(By::Css(selector)).await?;
        Ok(element.text().await?)
    }

    async fn close(self) -> Result<(), FetchError> {
        self.driver.quit().await?;
        info!("webdriver session closed");
        Ok(())
    }
}
