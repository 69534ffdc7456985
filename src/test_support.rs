pub use crate::browser::{BrowserPage, PageTiming, PdfOptions};

#[path = "../tests/common/fixtures.rs"]
mod fixtures;

pub use fixtures::*;
