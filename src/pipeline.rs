//! Wires the phases together: crawl, persist the URL list, render, assemble.

use anyhow::{anyhow, Result};
use colored::*;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::assembler::Assembler;
use crate::browser::BrowserPage;
use crate::config::Config;
use crate::crawler::{read_url_list, write_url_list, BrowserLinkSource, Crawler};
use crate::renderer::Renderer;

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// URLs written to the intermediate list.
    pub pages_discovered: usize,
    /// URLs the renderer attempted.
    pub pages_processed: usize,
    /// URLs whose PDF made it into the final document.
    pub pages_in_document: usize,
    pub output: PathBuf,
}

impl RunSummary {
    pub fn log(&self) {
        info!("{}", "Process completed!".green());
        info!("  - Pages discovered: {}", self.pages_discovered);
        info!("  - Pages processed: {}", self.pages_processed);
        info!("  - Pages in final document: {}", self.pages_in_document);
        info!(
            "  - PDF file generated: {}",
            self.output.display().to_string().blue()
        );
    }
}

/// Crawls the site and writes the URL list. Returns the persisted URLs.
pub async fn crawl<P>(page: &P, config: &Config) -> Result<Vec<String>>
where
    P: BrowserPage + ?Sized,
{
    let seed = config.seed()?;
    let source = BrowserLinkSource::new(page, config.timing());
    let discovered = Crawler::new(seed, &source)
        .with_max_pages(config.max_pages)
        .discover()
        .await?;

    let urls = discovered.persisted();
    write_url_list(&config.url_list, &urls).await?;
    if urls.is_empty() {
        return Err(anyhow!("No URLs found, please check input parameters"));
    }
    Ok(urls)
}

/// Renders every URL in `url_list` and merges them into the configured output.
pub async fn render<P>(page: &P, config: &Config, url_list: &Path) -> Result<RunSummary>
where
    P: BrowserPage + ?Sized,
{
    info!("Reading URLs from {}...", url_list.display().to_string().blue());
    let urls = read_url_list(url_list).await?;
    if urls.is_empty() {
        return Err(anyhow!("URL list {} is empty", url_list.display()));
    }

    info!("Starting PDF generation...");
    let renderer = Renderer::new(page, config.render_options(), &config.temp_dir);
    let results = renderer.render_all(&urls).await?;

    let output = config.output_path();
    let report = Assembler::new(&output, &config.temp_dir)
        .keep_pages(config.keep_pages)
        .assemble(&results)
        .await?
        .ok_or_else(|| anyhow!("PDF generation failed: no page could be rendered"))?;

    Ok(RunSummary {
        pages_discovered: urls.len(),
        pages_processed: results.len(),
        pages_in_document: report.merged,
        output: report.output,
    })
}

/// The full pipeline against an already-open page.
pub async fn run<P>(page: &P, config: &Config) -> Result<RunSummary>
where
    P: BrowserPage + ?Sized,
{
    info!(
        "Starting website crawl from {}{}...",
        config.base_url, config.start_path
    );
    crawl(page, config).await?;
    render(page, config, &config.url_list).await
}
