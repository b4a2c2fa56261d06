use thiserror::Error;

use crate::PaperRecord;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed bibliography: {0}")]
    Malformed(String),
}

/// Provides the bibliography records for one (venue, year) pair.
///
/// The concrete `.bib`-backed implementation lives in `offprint-bib`.
pub trait BibliographySource: Send + Sync {
    /// Load the records for one venue/year. `Ok(None)` means no bibliography
    /// exists for the pair; the engine then yields zero results and the
    /// batch continues.
    fn load(&self, venue: &str, year: &str) -> Result<Option<Vec<PaperRecord>>, SourceError>;
}
