use anyhow::Result;
use colored::*;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::renderer::PageRenderResult;
use crate::PdfMerger;

/// What ended up in the final document.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyReport {
    pub output: PathBuf,
    /// Per-page artifacts merged into the output.
    pub merged: usize,
    /// Physical PDF pages in the output.
    pub pdf_pages: usize,
}

/// Merges rendered page artifacts into one PDF and removes the intermediates.
pub struct Assembler {
    output: PathBuf,
    temp_dir: PathBuf,
    keep_pages: bool,
}

impl Assembler {
    pub fn new(output: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            temp_dir: temp_dir.into(),
            keep_pages: false,
        }
    }

    /// Leave the per-page PDFs and the temporary directory in place after merging.
    pub fn keep_pages(mut self, keep: bool) -> Self {
        self.keep_pages = keep;
        self
    }

    /// Merges the successful results in input order.
    ///
    /// Returns `Ok(None)` without writing anything when no page rendered. Cleanup of the
    /// intermediates runs whether or not the merge succeeded.
    pub async fn assemble(&self, results: &[PageRenderResult]) -> Result<Option<AssemblyReport>> {
        let artifacts: Vec<&Path> = results
            .iter()
            .filter_map(|r| r.artifact.as_deref())
            .collect();

        let outcome = if artifacts.is_empty() {
            warn!("No pages rendered successfully, nothing to merge");
            Ok(None)
        } else {
            self.merge(&artifacts).await.map(Some)
        };

        if !self.keep_pages {
            self.cleanup(&artifacts).await;
        }

        outcome
    }

    async fn merge(&self, artifacts: &[&Path]) -> Result<AssemblyReport> {
        info!("Merging {} PDF files...", artifacts.len());

        let mut merger = PdfMerger::new();
        for path in artifacts {
            if let Err(e) = merger.add_pdf(path).await {
                warn!("Failed to add PDF {}: {}", path.display(), e);
            }
        }

        let pdf_pages = merger.save(&self.output).await?;
        info!(
            "PDF merge completed! Output file: {}",
            self.output.display().to_string().blue()
        );

        Ok(AssemblyReport {
            output: self.output.clone(),
            merged: merger.len(),
            pdf_pages,
        })
    }

    async fn cleanup(&self, artifacts: &[&Path]) {
        info!("Cleaning up temporary files...");
        for path in artifacts {
            if let Err(e) = fs::remove_file(path).await {
                warn!("Error deleting temporary file {}: {}", path.display(), e);
            }
        }

        if let Err(e) = fs::remove_dir(&self.temp_dir).await {
            warn!(
                "Error deleting temporary directory {}: {}",
                self.temp_dir.display(),
                e
            );
        }
    }
}
