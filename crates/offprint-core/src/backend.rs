use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    Open(String),
    #[error("failed to extract text: {0}")]
    Extraction(String),
    #[error("failed to write PDF: {0}")]
    Write(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF access backends.
///
/// Implementors provide the low-level PDF operations the engine needs;
/// matching and orchestration live in [`engine`](crate::engine). Tests swap
/// in an in-memory implementation.
pub trait PdfBackend: Send + Sync {
    /// Extract the text of every page, in page order.
    fn page_texts(&self, path: &Path) -> Result<Vec<String>, BackendError>;

    /// Copy the inclusive page range `[first, last]` of `source` into a new
    /// single-paper PDF at `target`. An end past the last page of the
    /// document is clamped to it.
    fn extract_page_range(
        &self,
        source: &Path,
        first: usize,
        last: usize,
        target: &Path,
    ) -> Result<(), BackendError>;
}
