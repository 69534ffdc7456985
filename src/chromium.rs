use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::browser::{BrowserPage, PdfOptions};

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Consecutive unchanged polls before the network counts as idle (~500ms of quiet).
const IDLE_QUIET_POLLS: u32 = 2;

/// Clickable element kinds searched for the consent button, most specific first.
const CONSENT_SELECTORS: &[&str] = &[
    "button",
    "[role=\"button\"]",
    "input[type=\"button\"], input[type=\"submit\"]",
    "a",
];

/// A headless Chromium with a single tab reused for every navigation of a run.
pub struct BrowserSession {
    browser: Browser,
    handle: JoinHandle<()>,
    page: Page,
}

impl BrowserSession {
    pub async fn launch(headed: bool) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");
        if headed {
            builder = builder.with_head();
        }

        let config = builder
            .build()
            .map_err(|e| anyhow!("Failed to create browser config: {}", e))?;

        info!("Launching browser...");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(err) = h {
                    // websocket deserialization noise from newer Chrome builds
                    let err_str = err.to_string();
                    if !err_str.contains("data did not match any variant")
                        && !err_str.contains("untagged enum Message")
                    {
                        error!("Browser handler error: {}", err);
                    } else {
                        debug!("Chrome protocol message ignored: {}", err);
                    }
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handle.abort();
                return Err(anyhow!("Failed to create new page: {}", e));
            }
        };

        Ok(Self {
            browser,
            handle,
            page,
        })
    }

    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close reported: {}", e);
        }
        self.handle.abort();
        info!("Browser closed");
    }

    async fn network_snapshot(&self) -> Result<(String, u64)> {
        self.page
            .evaluate("[document.readyState, performance.getEntriesByType('resource').length]")
            .await
            .map_err(|e| anyhow!("Failed to read network state: {}", e))?
            .into_value::<(String, u64)>()
            .map_err(|e| anyhow!("Failed to parse network state: {}", e))
    }
}

fn consent_script(label: &str) -> Result<String> {
    let label = serde_json::to_string(&label.trim().to_lowercase())?;
    let selectors = serde_json::to_string(CONSENT_SELECTORS)?;
    Ok(format!(
        r#"
        (() => {{
            const label = {label};
            const visible = (el) => {{
                const rect = el.getBoundingClientRect();
                const style = window.getComputedStyle(el);
                return rect.width > 0 && rect.height > 0
                    && style.visibility !== 'hidden' && style.display !== 'none';
            }};
            for (const selector of {selectors}) {{
                for (const el of document.querySelectorAll(selector)) {{
                    const text = (el.innerText || el.value || '').trim().toLowerCase();
                    if (text === label && visible(el)) {{
                        el.click();
                        return true;
                    }}
                }}
            }}
            return false;
        }})()
        "#
    ))
}

#[async_trait]
impl BrowserPage for BrowserSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| anyhow!("Failed to navigate to {}: {}", url, e))?;
        Ok(())
    }

    async fn wait_for_network_idle(&self) -> Result<()> {
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| anyhow!("Failed to wait for navigation: {}", e))?;

        let mut last = None;
        let mut quiet = 0;
        loop {
            let (ready_state, resources) = self.network_snapshot().await?;
            if ready_state == "complete" && last == Some(resources) {
                quiet += 1;
                if quiet >= IDLE_QUIET_POLLS {
                    return Ok(());
                }
            } else {
                quiet = 0;
            }
            last = Some(resources);
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| anyhow!("Failed to get page content: {}", e))
    }

    async fn click_by_text(&self, label: &str) -> Result<bool> {
        let script = consent_script(label)?;
        self.page
            .evaluate(script.as_str())
            .await
            .map_err(|e| anyhow!("Failed to look for \"{}\" button: {}", label, e))?
            .into_value::<bool>()
            .map_err(|e| anyhow!("Failed to read click result: {}", e))
    }

    async fn print_pdf(&self, options: &PdfOptions) -> Result<Vec<u8>> {
        let params = PrintToPdfParams {
            scale: Some(options.scale),
            paper_width: Some(options.paper_width),
            paper_height: Some(options.paper_height),
            margin_top: Some(options.margin_top),
            margin_right: Some(options.margin_right),
            margin_bottom: Some(options.margin_bottom),
            margin_left: Some(options.margin_left),
            print_background: Some(options.print_background),
            prefer_css_page_size: Some(options.prefer_css_page_size),
            ..Default::default()
        };

        self.page
            .pdf(params)
            .await
            .map_err(|e| anyhow!("Failed to generate PDF: {}", e))
    }
}
