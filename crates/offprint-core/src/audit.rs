use thiserror::Error;

use crate::PaperRecord;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Append-only audit trail for one batch run.
///
/// The CSV-file implementation lives in `offprint-reporting`.
pub trait AuditSink {
    /// A decision produced a brand-new output file in this run.
    fn newly_found(&mut self, bibkey: &str) -> Result<(), AuditError>;

    /// A record was resolved by neither rule after all pages were scanned.
    fn not_found(&mut self, record: &PaperRecord) -> Result<(), AuditError>;
}
