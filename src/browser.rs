use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::debug;

/// A4 paper size in inches.
pub const A4_WIDTH_IN: f64 = 8.27;
pub const A4_HEIGHT_IN: f64 = 11.69;

/// Layout handed to the browser when printing a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub scale: f64,
    pub paper_width: f64,
    pub paper_height: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub print_background: bool,
    pub prefer_css_page_size: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            paper_width: A4_WIDTH_IN,
            paper_height: A4_HEIGHT_IN,
            margin_top: 0.4,
            margin_right: 0.4,
            margin_bottom: 0.4,
            margin_left: 0.4,
            print_background: true,
            prefer_css_page_size: true,
        }
    }
}

/// How long to wait for a page at each stage of loading it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTiming {
    pub navigation_timeout: Duration,
    pub idle_timeout: Duration,
    /// Fixed pause after network idle so deferred content can finish rendering.
    pub settle_delay: Duration,
}

impl Default for PageTiming {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// The single browser tab the crawler and renderer drive.
///
/// Every call may fail; callers decide whether a failure is retried, swallowed or
/// turned into a dead end.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn wait_for_network_idle(&self) -> Result<()>;

    /// Full markup of the currently loaded document.
    async fn content(&self) -> Result<String>;

    /// Clicks the first visible element whose text matches `label`.
    /// Returns `false` when nothing matched.
    async fn click_by_text(&self, label: &str) -> Result<bool>;

    async fn print_pdf(&self, options: &PdfOptions) -> Result<Vec<u8>>;
}

/// Navigates to `url`, waits for the network to go idle and then for the settle delay.
pub async fn load_page<P>(page: &P, url: &str, timing: &PageTiming) -> Result<()>
where
    P: BrowserPage + ?Sized,
{
    timeout(timing.navigation_timeout, page.navigate(url))
        .await
        .map_err(|_| {
            anyhow!(
                "Navigation to {} timed out after {:?}",
                url,
                timing.navigation_timeout
            )
        })??;

    timeout(timing.idle_timeout, page.wait_for_network_idle())
        .await
        .map_err(|_| {
            anyhow!(
                "Waiting for network idle on {} timed out after {:?}",
                url,
                timing.idle_timeout
            )
        })??;

    if !timing.settle_delay.is_zero() {
        debug!("Settling {:?} on {}", timing.settle_delay, url);
        sleep(timing.settle_delay).await;
    }

    Ok(())
}
