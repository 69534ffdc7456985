use anyhow::{anyhow, Result};
use lopdf::{Document, Object, ObjectId};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Concatenates whole PDF documents, in the order they were added.
pub struct PdfMerger {
    documents: Vec<(String, Document)>,
}

impl PdfMerger {
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub async fn add_pdf(&mut self, path: &Path) -> Result<()> {
        let data = fs::read(path)
            .await
            .map_err(|e| anyhow!("Failed to read PDF file {}: {}", path.display(), e))?;

        let document = Document::load_mem(&data)
            .map_err(|e| anyhow!("Failed to parse PDF file {}: {}", path.display(), e))?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.pdf")
            .to_string();

        debug!(
            "Loaded PDF with {} pages from {}",
            document.get_pages().len(),
            path.display()
        );
        self.documents.push((filename, document));

        Ok(())
    }

    /// Writes the merged document and returns its page count.
    pub async fn save(&self, output_path: &Path) -> Result<usize> {
        let mut merged_doc = self.merge()?;
        let page_count = merged_doc.get_pages().len();

        info!("Finalizing merged PDF with {} total pages", page_count);

        let mut data = Vec::new();
        merged_doc
            .save_to(&mut data)
            .map_err(|e| anyhow!("Failed to serialize merged PDF: {}", e))?;

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| anyhow!("Failed to create directory {}: {}", parent.display(), e))?;
            }
        }

        fs::write(output_path, data).await.map_err(|e| {
            anyhow!(
                "Failed to write merged PDF to {}: {}",
                output_path.display(),
                e
            )
        })?;

        info!(
            "Successfully merged {} PDFs into {}",
            self.documents.len(),
            output_path.display()
        );
        Ok(page_count)
    }

    fn merge(&self) -> Result<Document> {
        let Some(((_, first), rest)) = self.documents.split_first() else {
            return Err(anyhow!("No PDFs added to merge"));
        };

        // The first document is the base; its page tree receives every other page.
        let mut merged_doc = first.clone();
        let pages_id = pages_root(&merged_doc)?;
        let mut all_page_ids: Vec<ObjectId> = merged_doc.get_pages().into_values().collect();
        let mut max_id = merged_doc.max_id;

        for (i, (filename, document)) in rest.iter().enumerate() {
            debug!(
                "Processing document {}: {} with {} pages",
                i + 2,
                filename,
                document.get_pages().len()
            );

            let mut doc_copy = document.clone();
            doc_copy.renumber_objects_with(max_id + 1);
            max_id = doc_copy.max_id;

            let pages: Vec<ObjectId> = doc_copy.get_pages().into_values().collect();
            merged_doc.objects.extend(doc_copy.objects);
            all_page_ids.extend(pages);
        }

        debug!("Total pages collected: {}", all_page_ids.len());

        // Every page becomes a direct kid of the base root, including base pages that sat
        // under an intermediate node.
        for page_id in &all_page_ids {
            if let Ok(Object::Dictionary(page)) = merged_doc.get_object_mut(*page_id) {
                page.set("Parent", Object::Reference(pages_id));
            }
        }

        match merged_doc.get_object_mut(pages_id) {
            Ok(Object::Dictionary(pages_dict)) => {
                pages_dict.set("Count", Object::Integer(all_page_ids.len() as i64));
                pages_dict.set(
                    "Kids",
                    Object::Array(all_page_ids.into_iter().map(Object::Reference).collect()),
                );
            }
            _ => return Err(anyhow!("Base PDF has no usable page tree")),
        }

        merged_doc.max_id = max_id;
        Ok(merged_doc)
    }
}

fn pages_root(document: &Document) -> Result<ObjectId> {
    document
        .catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| anyhow!("Base PDF has no page tree: {}", e))
}

impl Default for PdfMerger {
    fn default() -> Self {
        Self::new()
    }
}
