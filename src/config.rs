use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use slug::slugify;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::browser::{PageTiming, PdfOptions};
use crate::renderer::RenderOptions;
use crate::scope::SeedSpec;

/// Everything a run needs to know. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub start_path: String,
    pub skip_patterns: Vec<String>,
    /// Final PDF. Derived from the site when unset.
    pub output: Option<PathBuf>,
    pub url_list: PathBuf,
    pub temp_dir: PathBuf,
    pub consent_button_text: Option<String>,
    pub max_attempts: u32,
    pub navigation_timeout_secs: f64,
    pub idle_timeout_secs: f64,
    pub settle_delay_secs: f64,
    pub retry_backoff_secs: f64,
    pub max_pages: Option<usize>,
    pub headed: bool,
    pub keep_pages: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://langchain-ai.github.io".to_string(),
            start_path: "/langgraph/".to_string(),
            skip_patterns: vec!["#_".to_string(), "?q=".to_string()],
            output: None,
            url_list: PathBuf::from("docs.txt"),
            temp_dir: PathBuf::from("temp_pdfs"),
            consent_button_text: Some("Accept".to_string()),
            max_attempts: 3,
            navigation_timeout_secs: 30.0,
            idle_timeout_secs: 30.0,
            settle_delay_secs: 2.0,
            retry_backoff_secs: 5.0,
            max_pages: None,
            headed: false,
            keep_pages: false,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        serde_json::from_str(&data)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path.display(), e))
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| anyhow!("Invalid base URL {}: {}", self.base_url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("Base URL must be http or https, got {}", url.scheme()));
        }
        if url.host_str().is_none() {
            return Err(anyhow!("Base URL {} has no host", self.base_url));
        }

        if self.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be at least 1"));
        }

        let durations = [
            ("navigation_timeout_secs", self.navigation_timeout_secs),
            ("idle_timeout_secs", self.idle_timeout_secs),
            ("settle_delay_secs", self.settle_delay_secs),
            ("retry_backoff_secs", self.retry_backoff_secs),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!("{} must be zero or a positive number", name));
            }
        }

        Ok(())
    }

    pub fn seed(&self) -> Result<SeedSpec> {
        SeedSpec::new(&self.base_url, &self.start_path, self.skip_patterns.clone())
    }

    /// The configured output, or `<host>-<start path>.pdf` when none was given.
    pub fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }

        let host = Url::parse(&self.base_url)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.replace('.', "-")))
            .unwrap_or_else(|| "documentation".to_string());
        let name = slugify(format!("{} {}", host, self.start_path));
        PathBuf::from(format!("{}.pdf", name))
    }

    pub fn timing(&self) -> PageTiming {
        PageTiming {
            navigation_timeout: Duration::from_secs_f64(self.navigation_timeout_secs),
            idle_timeout: Duration::from_secs_f64(self.idle_timeout_secs),
            settle_delay: Duration::from_secs_f64(self.settle_delay_secs),
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            max_attempts: self.max_attempts,
            retry_backoff: Duration::from_secs_f64(self.retry_backoff_secs),
            timing: self.timing(),
            consent_button_text: self
                .consent_button_text
                .clone()
                .filter(|label| !label.trim().is_empty()),
            pdf: PdfOptions::default(),
        }
    }
}
