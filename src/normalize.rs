use anyhow::{anyhow, Result};
use std::fmt;
use url::Url;

/// Canonical key for a documentation page.
///
/// Two raw URLs that normalize to the same key are the same logical page. The key is
/// the raw URL with its fragment dropped and a `/` appended to the path when missing.
/// Query strings are kept as-is, so `/page?x=1` becomes `/page/?x=1` and stays distinct
/// from `/page/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedUrl(Url);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn path(&self) -> &str {
        self.0.path()
    }

    pub fn host_str(&self) -> Option<&str> {
        self.0.host_str()
    }

    pub fn port(&self) -> Option<u16> {
        self.0.port()
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

pub fn normalize_url(raw: &str) -> Result<NormalizedUrl> {
    let url = Url::parse(raw).map_err(|e| anyhow!("Failed to parse URL {}: {}", raw, e))?;
    Ok(normalize(url))
}

pub fn normalize(mut url: Url) -> NormalizedUrl {
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    NormalizedUrl(url)
}

/// Resolves an `href` found on `page` into an absolute http(s) URL.
///
/// Empty hrefs and in-page anchors (`#...`) are dropped, as is anything that does not
/// end up on an http or https scheme (`mailto:`, `javascript:` and friends).
pub fn resolve_link(page: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let url = page.join(href).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_trailing_slash() {
        let url = normalize_url("https://example.com/docs/page").unwrap();
        assert_eq!(url.as_str(), "https://example.com/docs/page/");
    }

    #[test]
    fn test_strips_fragment() {
        let url = normalize_url("https://example.com/docs/page/#install").unwrap();
        assert_eq!(url.as_str(), "https://example.com/docs/page/");
    }

    #[test]
    fn test_fragment_and_missing_slash_collapse_to_same_key() {
        let a = normalize_url("https://example.com/docs/page#a").unwrap();
        let b = normalize_url("https://example.com/docs/page/").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_query_is_preserved_after_path_slash() {
        let url = normalize_url("https://example.com/docs/search?q=test").unwrap();
        assert_eq!(url.as_str(), "https://example.com/docs/search/?q=test");
        assert_ne!(url, normalize_url("https://example.com/docs/search/").unwrap());
    }

    #[test]
    fn test_bare_origin_gets_root_path() {
        let url = normalize_url("https://example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let samples = [
            "https://example.com",
            "https://example.com/docs",
            "https://example.com/docs/page#frag",
            "https://example.com/docs/page?x=1",
            "https://example.com/docs/page?x=1/#y",
            "http://Example.COM:8080/a/b.html",
        ];
        for raw in samples {
            let once = normalize_url(raw).unwrap();
            let twice = normalize_url(once.as_str()).unwrap();
            assert_eq!(once, twice, "normalizing {raw} twice changed the key");
        }
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(normalize_url("not a url").is_err());
    }

    #[test]
    fn test_resolve_link_relative_to_page() {
        let page = Url::parse("https://example.com/docs/guide/").unwrap();
        let url = resolve_link(&page, "../api/").unwrap();
        assert_eq!(url.as_str(), "https://example.com/docs/api/");

        let url = resolve_link(&page, "/docs/intro").unwrap();
        assert_eq!(url.as_str(), "https://example.com/docs/intro");
    }

    #[test]
    fn test_resolve_link_drops_anchors_and_other_schemes() {
        let page = Url::parse("https://example.com/docs/").unwrap();
        assert!(resolve_link(&page, "").is_none());
        assert!(resolve_link(&page, "#section").is_none());
        assert!(resolve_link(&page, "mailto:team@example.com").is_none());
        assert!(resolve_link(&page, "javascript:void(0)").is_none());
    }
}
