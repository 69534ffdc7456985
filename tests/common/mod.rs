pub use docs2pdf::{BrowserPage, PageTiming, PdfOptions};

mod fixtures;

pub use fixtures::*;
