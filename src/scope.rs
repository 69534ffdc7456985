use anyhow::{anyhow, Result};
use tracing::debug;
use url::Url;

use crate::normalize::{normalize, NormalizedUrl};

/// Extensions that mark a static asset rather than a documentation page.
///
/// Matched as case-insensitive substrings anywhere in the path, so
/// `/docs/image.png/extra` is rejected just like `/docs/image.png`.
pub const STATIC_ASSET_EXTENSIONS: &[&str] = &[".jpg", ".png", ".gif", ".css", ".js"];

/// The fixed description of one crawl: where it starts and what it may touch.
#[derive(Debug, Clone)]
pub struct SeedSpec {
    base: Url,
    start_path: String,
    skip_patterns: Vec<String>,
}

impl SeedSpec {
    pub fn new(base_url: &str, start_path: &str, skip_patterns: Vec<String>) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| anyhow!("Failed to parse base URL {}: {}", base_url, e))?;

        if base.host_str().is_none() {
            return Err(anyhow!("Base URL {} has no host", base_url));
        }

        Ok(Self {
            base,
            start_path: normalize_start_path(start_path),
            skip_patterns,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Always begins and ends with `/`.
    pub fn start_path(&self) -> &str {
        &self.start_path
    }

    pub fn skip_patterns(&self) -> &[String] {
        &self.skip_patterns
    }

    pub fn start_url(&self) -> Result<NormalizedUrl> {
        let url = self
            .base
            .join(&self.start_path)
            .map_err(|e| anyhow!("Failed to join start path {}: {}", self.start_path, e))?;
        Ok(normalize(url))
    }

    fn same_origin(&self, url: &NormalizedUrl) -> bool {
        url.host_str() == self.base.host_str() && url.port() == self.base.port()
    }
}

fn normalize_start_path(path: &str) -> String {
    let mut path = path.trim().to_string();
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    if !path.ends_with('/') {
        path.push('/');
    }
    path
}

pub fn is_static_asset(path: &str) -> bool {
    let path = path.to_lowercase();
    STATIC_ASSET_EXTENSIONS.iter().any(|ext| path.contains(ext))
}

pub fn matching_skip_pattern<'a>(url: &NormalizedUrl, seed: &'a SeedSpec) -> Option<&'a str> {
    seed.skip_patterns
        .iter()
        .map(String::as_str)
        .find(|pattern| !pattern.is_empty() && url.as_str().contains(pattern))
}

/// Decides whether a normalized URL may be crawled and rendered for `seed`.
pub fn in_scope(url: &NormalizedUrl, seed: &SeedSpec) -> bool {
    if !seed.same_origin(url) {
        return false;
    }

    let path = url.path();
    if !path.starts_with(seed.start_path()) {
        return false;
    }

    if is_static_asset(path) {
        return false;
    }

    if let Some(pattern) = matching_skip_pattern(url, seed) {
        debug!("Skipping URL with pattern '{}': {}", pattern, url);
        return false;
    }

    true
}
