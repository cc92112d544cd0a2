//! Headless Chromium page source
//!
//! Renders a page through the Chrome DevTools Protocol so that content built by
//! client-side scripts is present in the captured HTML. A fresh browser is
//! launched per render and closed afterwards.

use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

use anyhow::{anyhow, Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::extraction::PageSource;

/// Configuration for the headless renderer
#[derive(Debug, Clone)]
pub struct ChromiumConfig {
    /// Path to Chrome/Chromium executable
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    /// Upper bound for launch + navigation + capture
    pub timeout: Duration,
    /// Settle time after navigation
    pub render_wait: Duration,
}

impl From<&common::ExtractionConfig> for ChromiumConfig {
    fn from(cfg: &common::ExtractionConfig) -> Self {
        Self {
            chrome_path: cfg.chrome_path.as_ref().map(PathBuf::from),
            headless: cfg.headless,
            timeout: Duration::from_secs(cfg.timeout_seconds),
            render_wait: Duration::from_millis(cfg.render_wait_ms),
        }
    }
}

pub struct ChromiumPageSource {
    config: ChromiumConfig,
}

impl ChromiumPageSource {
    #[must_use]
    pub fn new(config: ChromiumConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder();

        if !self.config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if let Some(ref chrome_path) = self.config.chrome_path {
            builder = builder.chrome_executable(chrome_path);
        }

        builder.build().map_err(|e| anyhow!("browser config error: {}", e))
    }

    async fn render(&self, browser: &Browser, url: &str) -> Result<String> {
        let page = browser.new_page(url).await.context("failed to open page")?;
        page.wait_for_navigation().await.context("navigation failed")?;

        if !self.config.render_wait.is_zero() {
            tokio::time::sleep(self.config.render_wait).await;
        }

        page.content().await.context("failed to capture rendered HTML")
    }
}

#[async_trait::async_trait]
impl PageSource for ChromiumPageSource {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let config = self.browser_config()?;
        let started = Instant::now();

        let (mut browser, mut handler) = tokio::time::timeout(self.config.timeout, Browser::launch(config))
            .await
            .map_err(|_| anyhow!("browser launch timed out after {:?}", self.config.timeout))?
            .context("failed to launch headless browser")?;

        let handler_task = tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });
        debug!(%url, "browser launched");

        // Navigation and capture get whatever the launch left of the budget
        let remaining = self.config.timeout.saturating_sub(started.elapsed());
        let rendered = tokio::time::timeout(remaining, self.render(&browser, url))
            .await
            .map_err(|_| anyhow!("browser render timed out after {:?}", self.config.timeout))
            .and_then(|r| r);

        if let Err(e) = browser.close().await {
            warn!(error = %e, "failed to close browser cleanly");
        }
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "browser process did not exit cleanly");
        }
        handler_task.abort();

        let html = rendered?;
        info!(%url, bytes = html.len(), "browser: captured rendered page");
        Ok(html)
    }
}
