use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;

/// Collects the raw `href` values of every anchor in `html`, in document order,
/// without duplicates. Values are returned untouched; resolving them is up to the caller.
pub fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    let Ok(selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            if seen.insert(href) {
                links.push(href.to_string());
            }
        }
    }

    debug!("Collected {} unique links", links.len());
    links
}
