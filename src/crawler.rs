use anyhow::{anyhow, Result};
use async_trait::async_trait;
use colored::*;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{load_page, BrowserPage, PageTiming};
use crate::links::extract_links;
use crate::normalize::{normalize, resolve_link, NormalizedUrl};
use crate::scope::{in_scope, SeedSpec};

/// Discovered URLs containing this token are left out of the persisted list.
pub const EXCLUDED_TOKEN: &str = "/?q=";

/// Loads a page and reports the raw `href` targets found on it.
#[async_trait]
pub trait LinkSource: Send + Sync {
    async fn fetch_links(&self, url: &Url) -> Result<Vec<String>>;
}

/// Fetches links by driving a browser tab: load, wait for idle, settle, read markup.
pub struct BrowserLinkSource<'a, P: ?Sized> {
    page: &'a P,
    timing: PageTiming,
}

impl<'a, P: BrowserPage + ?Sized> BrowserLinkSource<'a, P> {
    pub fn new(page: &'a P, timing: PageTiming) -> Self {
        Self { page, timing }
    }
}

#[async_trait]
impl<'a, P: BrowserPage + ?Sized> LinkSource for BrowserLinkSource<'a, P> {
    async fn fetch_links(&self, url: &Url) -> Result<Vec<String>> {
        load_page(self.page, url.as_str(), &self.timing).await?;
        let content = self.page.content().await?;
        Ok(extract_links(&content))
    }
}

/// Every in-scope page a crawl reached, kept sorted.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredPages {
    pages: BTreeSet<NormalizedUrl>,
}

impl DiscoveredPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: NormalizedUrl) -> bool {
        self.pages.insert(url)
    }

    pub fn contains(&self, url: &NormalizedUrl) -> bool {
        self.pages.contains(url)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedUrl> {
        self.pages.iter()
    }

    /// The list handed to the renderer: sorted, minus anything containing [`EXCLUDED_TOKEN`].
    pub fn persisted(&self) -> Vec<String> {
        self.pages
            .iter()
            .map(NormalizedUrl::as_str)
            .filter(|url| !url.contains(EXCLUDED_TOKEN))
            .map(str::to_string)
            .collect()
    }
}

/// Depth-first traversal of one site, deduplicated on normalized URLs.
///
/// Each crawler owns its own visited set, so independent crawls never share state.
pub struct Crawler<'a, L: ?Sized> {
    seed: SeedSpec,
    source: &'a L,
    max_pages: Option<usize>,
    visited: HashSet<NormalizedUrl>,
    discovered: DiscoveredPages,
}

impl<'a, L: LinkSource + ?Sized> Crawler<'a, L> {
    pub fn new(seed: SeedSpec, source: &'a L) -> Self {
        Self {
            seed,
            source,
            max_pages: None,
            visited: HashSet::new(),
            discovered: DiscoveredPages::new(),
        }
    }

    /// Stops fetching once this many pages have been visited.
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub async fn discover(mut self) -> Result<DiscoveredPages> {
        let start = self.seed.start_url()?;
        info!("Starting crawl from: {}", start.as_str().green());

        let mut stack = vec![start];
        while let Some(url) = stack.pop() {
            if self.visited.contains(&url) {
                continue;
            }
            if let Some(max) = self.max_pages {
                if self.visited.len() >= max {
                    warn!("Reached page limit of {}, stopping crawl", max);
                    break;
                }
            }

            self.visited.insert(url.clone());
            self.discovered.insert(url.clone());

            let children = self.children_of(&url).await;
            // reversed so the first link returned is the next one visited
            stack.extend(children.into_iter().rev());
        }

        info!(
            "Crawl completed: {} pages processed, {} unique pages found",
            self.visited.len(),
            self.discovered.len()
        );
        Ok(self.discovered)
    }

    async fn children_of(&self, url: &NormalizedUrl) -> Vec<NormalizedUrl> {
        info!("Processing page: {}", url.as_str().green());

        let raw_links = match self.source.fetch_links(url.as_url()).await {
            Ok(links) => links,
            Err(e) => {
                warn!("Error processing {}: {}", url, e);
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut children = Vec::new();
        for href in raw_links {
            let Some(resolved) = resolve_link(url.as_url(), &href) else {
                continue;
            };
            let link = normalize(resolved);
            if self.visited.contains(&link) || !in_scope(&link, &self.seed) {
                continue;
            }
            if seen.insert(link.clone()) {
                debug!("Found subpage: {}", link);
                children.push(link);
            }
        }
        children
    }
}

pub async fn write_url_list(path: &Path, urls: &[String]) -> Result<()> {
    let mut contents = urls.join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }

    fs::write(path, contents)
        .await
        .map_err(|e| anyhow!("Failed to write URL list to {}: {}", path.display(), e))?;

    info!(
        "Saved {} URLs to {}",
        urls.len(),
        path.display().to_string().blue()
    );
    Ok(())
}

pub async fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .await
        .map_err(|e| anyhow!("Failed to read URL list {}: {}", path.display(), e))?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
