use std::path::Path;

use mupdf::pdf::PdfDocument;
use mupdf::{Document, TextPageFlags};

use offprint_core::{BackendError, PdfBackend};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island — it isolates the mupdf dependency
/// (which is AGPL-3.0) so that non-PDF code paths do not transitively
/// depend on it.
#[derive(Default)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for MupdfBackend {
    fn page_texts(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::Open("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::Open(e.to_string()))?;

        let mut pages_text = Vec::new();

        for page_result in document
            .pages()
            .map_err(|e| BackendError::Extraction(e.to_string()))?
        {
            let page = page_result.map_err(|e| BackendError::Extraction(e.to_string()))?;
            let text_page = page
                .to_text_page(TextPageFlags::empty())
                .map_err(|e| BackendError::Extraction(e.to_string()))?;

            // Block/line iteration keeps one line per text line; the match
            // rules and the prompt display both rely on the line breaks.
            let mut page_text = String::new();
            for block in text_page.blocks() {
                for line in block.lines() {
                    let line_text: String = line
                        .chars()
                        .map(|c| c.char().unwrap_or('\u{FFFD}'))
                        .collect();
                    page_text.push_str(&line_text);
                    page_text.push('\n');
                }
            }
            pages_text.push(page_text);
        }

        Ok(pages_text)
    }

    fn extract_page_range(
        &self,
        source: &Path,
        first: usize,
        last: usize,
        target: &Path,
    ) -> Result<(), BackendError> {
        let source_str = source
            .to_str()
            .ok_or_else(|| BackendError::Open("invalid path encoding".into()))?;
        let target_str = target
            .to_str()
            .ok_or_else(|| BackendError::Write("invalid path encoding".into()))?;

        let mut paper =
            PdfDocument::open(source_str).map_err(|e| BackendError::Open(e.to_string()))?;
        let page_count = paper
            .page_count()
            .map_err(|e| BackendError::Extraction(e.to_string()))? as usize;

        if page_count == 0 || first >= page_count {
            return Err(BackendError::Extraction(format!(
                "page {} out of range ({} has {} pages)",
                first,
                source.display(),
                page_count
            )));
        }
        // an end past the last page is clamped to it
        let last = last.min(page_count - 1);

        // Reduce the document to [first, last]; delete back to front so
        // page numbers stay valid while deleting.
        for page in ((last + 1)..page_count).rev() {
            paper
                .delete_page(page as i32)
                .map_err(|e| BackendError::Write(e.to_string()))?;
        }
        for page in (0..first).rev() {
            paper
                .delete_page(page as i32)
                .map_err(|e| BackendError::Write(e.to_string()))?;
        }

        paper
            .save(target_str)
            .map_err(|e| BackendError::Write(e.to_string()))?;
        Ok(())
    }
}
