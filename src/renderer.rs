use anyhow::{anyhow, Result};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::browser::{load_page, BrowserPage, PageTiming, PdfOptions};

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Total attempts per URL, including the first one.
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub timing: PageTiming,
    /// Visible text of a consent button to click before printing.
    pub consent_button_text: Option<String>,
    pub pdf: PdfOptions,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff: Duration::from_secs(5),
            timing: PageTiming::default(),
            consent_button_text: None,
            pdf: PdfOptions::default(),
        }
    }
}

/// Outcome of rendering one URL of the list.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRenderResult {
    /// 1-based position in the input list.
    pub index: usize,
    pub url: String,
    /// The written PDF, present only on success.
    pub artifact: Option<PathBuf>,
    pub attempts: u32,
}

impl PageRenderResult {
    pub fn is_success(&self) -> bool {
        self.artifact.is_some()
    }
}

pub fn artifact_path(temp_dir: &Path, index: usize) -> PathBuf {
    temp_dir.join(format!("page_{}.pdf", index))
}

/// Prints each URL of a list to its own PDF, one at a time, on a single browser tab.
pub struct Renderer<'a, P: ?Sized> {
    page: &'a P,
    options: RenderOptions,
    temp_dir: PathBuf,
}

impl<'a, P: BrowserPage + ?Sized> Renderer<'a, P> {
    pub fn new(page: &'a P, options: RenderOptions, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            page,
            options,
            temp_dir: temp_dir.into(),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Renders every URL in order. A URL that exhausts its attempts is recorded as
    /// failed and the batch moves on.
    pub async fn render_all(&self, urls: &[String]) -> Result<Vec<PageRenderResult>> {
        fs::create_dir_all(&self.temp_dir).await.map_err(|e| {
            anyhow!(
                "Failed to create temporary directory {}: {}",
                self.temp_dir.display(),
                e
            )
        })?;

        let total = urls.len();
        let mut results = Vec::with_capacity(total);
        for (i, url) in urls.iter().enumerate() {
            let index = i + 1;
            info!("Processing ({}/{}): {}", index, total, url.green());
            results.push(self.render_url(index, url).await);
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!("Rendered {} of {} pages", succeeded, total);
        Ok(results)
    }

    pub async fn render_url(&self, index: usize, url: &str) -> PageRenderResult {
        let path = artifact_path(&self.temp_dir, index);
        let max_attempts = self.options.max_attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.render_attempt(url, &path).await {
                Ok(()) => {
                    debug!("Saved {} to {}", url, path.display());
                    return PageRenderResult {
                        index,
                        url: url.to_string(),
                        artifact: Some(path),
                        attempts: attempt,
                    };
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        "Attempt {}/{} failed for {}: {}",
                        attempt, max_attempts, url, e
                    );
                    tokio::time::sleep(self.options.retry_backoff).await;
                }
                Err(e) => {
                    error!(
                        "{}",
                        format!(
                            "Giving up on {} after {} attempts: {}",
                            url, attempt, e
                        )
                        .red()
                    );
                    return PageRenderResult {
                        index,
                        url: url.to_string(),
                        artifact: None,
                        attempts: attempt,
                    };
                }
            }
        }
    }

    async fn render_attempt(&self, url: &str, path: &Path) -> Result<()> {
        load_page(self.page, url, &self.options.timing).await?;

        if let Some(label) = &self.options.consent_button_text {
            self.dismiss_consent(label).await;
        }

        let pdf_data = self.page.print_pdf(&self.options.pdf).await?;

        fs::write(path, pdf_data)
            .await
            .map_err(|e| anyhow!("Failed to write PDF to {}: {}", path.display(), e))
    }

    async fn dismiss_consent(&self, label: &str) {
        match self.page.click_by_text(label).await {
            Ok(true) => debug!("Clicked \"{}\" consent button", label),
            Ok(false) => debug!("No visible \"{}\" button", label),
            Err(e) => debug!("Ignoring consent click error: {}", e),
        }
    }
}
