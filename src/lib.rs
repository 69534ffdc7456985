//! # docs2pdf
//!
//! Crawls a documentation website and renders every page it finds into a single PDF
//! for offline reading.
//!
//! The run has two phases sharing one browser tab:
//!
//! - **crawl**: a depth-first walk from the start path over `<a href>` links, keeping only
//!   same-host pages under the start path. The sorted result is written to a URL list.
//! - **render**: every URL of the list is printed to its own PDF with retries, then the
//!   successful pages are merged in list order.
//!
//! ## Usage
//!
//! ```bash
//! docs2pdf run --base-url https://docs.example.com --start-path /guide/ -o guide.pdf
//! ```

pub mod assembler;
pub mod browser;
pub mod chromium;
pub mod config;
pub mod crawler;
pub mod links;
pub mod normalize;
pub mod pipeline;
mod pdf_merger;
pub mod renderer;
pub mod scope;

#[cfg(test)]
mod test_support;

pub use assembler::{Assembler, AssemblyReport};
pub use browser::{BrowserPage, PageTiming, PdfOptions};
pub use chromium::BrowserSession;
pub use config::Config;
pub use crawler::{Crawler, DiscoveredPages, LinkSource};
pub use normalize::{normalize_url, NormalizedUrl};
pub use pdf_merger::PdfMerger;
pub use pipeline::RunSummary;
pub use renderer::{PageRenderResult, RenderOptions, Renderer};
pub use scope::{in_scope, SeedSpec};
