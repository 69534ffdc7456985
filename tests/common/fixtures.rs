//! In-memory browser tab and PDF builders shared by unit and integration tests.
//!
//! The including module brings `BrowserPage`, `PageTiming` and `PdfOptions` into scope.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use super::{BrowserPage, PageTiming, PdfOptions};

fn add_page(doc: &mut Document, parent: ObjectId, width: i64) -> ObjectId {
    let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), 842.into()],
    })
}

fn finish(mut doc: Document, root_pages: ObjectId) -> Vec<u8> {
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => root_pages,
    });
    doc.trailer.set("Root", catalog_id);

    let mut data = Vec::new();
    doc.save_to(&mut data).unwrap();
    data
}

/// Builds a PDF with one page per entry; each page's MediaBox width is the entry.
pub fn sample_pdf(page_widths: &[i64]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = page_widths
        .iter()
        .map(|width| add_page(&mut doc, pages_id, *width).into())
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    finish(doc, pages_id)
}

/// Like [`sample_pdf`], but the pages hang off an intermediate `Pages` node the way
/// Chromium lays out longer documents.
pub fn nested_sample_pdf(page_widths: &[i64]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let root_id = doc.new_object_id();
    let branch_id = doc.new_object_id();

    let kids: Vec<Object> = page_widths
        .iter()
        .map(|width| add_page(&mut doc, branch_id, *width).into())
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        branch_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Parent" => root_id,
            "Kids" => kids,
            "Count" => count,
        }),
    );
    doc.objects.insert(
        root_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(branch_id)],
            "Count" => count,
        }),
    );
    finish(doc, root_id)
}

/// Reads back the MediaBox widths of every page, in page order.
pub fn page_widths(path: &Path) -> Vec<i64> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|page_id| {
            let page = doc.get_object(*page_id).unwrap().as_dict().unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            media_box[2].as_i64().unwrap()
        })
        .collect()
}

/// Counts pages whose `Parent` does not list them among its `Kids`.
pub fn pages_with_stale_parent(path: &Path) -> usize {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .filter(|page_id| {
            let page = doc.get_object(**page_id).unwrap().as_dict().unwrap();
            let parent_id = page.get(b"Parent").unwrap().as_reference().unwrap();
            let kids = doc
                .get_object(parent_id)
                .and_then(Object::as_dict)
                .and_then(|parent| parent.get(b"Kids"))
                .and_then(Object::as_array);
            match kids {
                Ok(kids) => !kids
                    .iter()
                    .any(|kid| kid.as_reference().ok() == Some(**page_id)),
                Err(_) => true,
            }
        })
        .count()
}

/// Markup for a page whose only content is a nav of `links`.
pub fn nav_html(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{href}">{href}</a>"#))
        .collect();
    format!("<html><body><nav>{anchors}</nav></body></html>")
}

#[derive(Default)]
struct MockState {
    current: Option<String>,
    navigations: Vec<String>,
    print_attempts: HashMap<String, u32>,
    clicks: Vec<String>,
}

/// A fake browser tab serving canned HTML by URL.
///
/// Printing a page yields a one-page PDF whose width is `100 + n`, where `n` is the
/// position the page was registered at.
#[derive(Default)]
pub struct MockPage {
    pages: Vec<(String, String)>,
    render_failures: HashMap<String, u32>,
    consent_labels: HashSet<String>,
    consent_errors: bool,
    idle_delay: Option<Duration>,
    state: Mutex<MockState>,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instant_timing() -> PageTiming {
        PageTiming {
            navigation_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(5),
            settle_delay: Duration::ZERO,
        }
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.push((url.to_string(), html.to_string()));
        self
    }

    /// The first `times` prints of `url` fail. `u32::MAX` means always.
    pub fn with_render_failures(mut self, url: &str, times: u32) -> Self {
        self.render_failures.insert(url.to_string(), times);
        self
    }

    pub fn with_consent_button(mut self, label: &str) -> Self {
        self.consent_labels.insert(label.to_string());
        self
    }

    pub fn with_consent_errors(mut self) -> Self {
        self.consent_errors = true;
        self
    }

    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = Some(delay);
        self
    }

    pub fn width_of(&self, url: &str) -> i64 {
        let position = self.pages.iter().position(|(u, _)| u == url).unwrap();
        100 + position as i64
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn print_attempts(&self, url: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .print_attempts
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    fn html_for(&self, url: &str) -> Option<&str> {
        self.pages
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, html)| html.as_str())
    }

    fn current(&self) -> Result<String> {
        self.state
            .lock()
            .unwrap()
            .current
            .clone()
            .ok_or_else(|| anyhow!("no page loaded"))
    }
}

#[async_trait]
impl BrowserPage for MockPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        if self.html_for(url).is_none() {
            state.current = None;
            return Err(anyhow!("net::ERR_NAME_NOT_RESOLVED at {}", url));
        }
        state.current = Some(url.to_string());
        Ok(())
    }

    async fn wait_for_network_idle(&self) -> Result<()> {
        if let Some(delay) = self.idle_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        let url = self.current()?;
        Ok(self.html_for(&url).unwrap_or_default().to_string())
    }

    async fn click_by_text(&self, label: &str) -> Result<bool> {
        if self.consent_errors {
            return Err(anyhow!("Execution context was destroyed"));
        }
        if self.consent_labels.contains(label) {
            self.state.lock().unwrap().clicks.push(label.to_string());
            return Ok(true);
        }
        Ok(false)
    }

    async fn print_pdf(&self, _options: &PdfOptions) -> Result<Vec<u8>> {
        let url = self.current()?;
        let attempt = {
            let mut state = self.state.lock().unwrap();
            let count = state.print_attempts.entry(url.clone()).or_insert(0);
            *count += 1;
            *count
        };

        if let Some(failures) = self.render_failures.get(&url) {
            if attempt <= *failures {
                return Err(anyhow!("Printing {} failed on attempt {}", url, attempt));
            }
        }

        Ok(sample_pdf(&[self.width_of(&url)]))
    }
}
