//! Timestamped audit logs for one batch run.
//!
//! Three CSV files per run, named by the run's start time:
//! `<ts>_log.csv` (one summary row per venue/year), `<ts>_new_found.csv`
//! (one row per output file actually written), `<ts>_not_found.csv` (one row
//! per record resolved by neither rule). Rows are appended and flushed as
//! events happen.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use offprint_core::{AuditError, AuditSink, PaperRecord, RunCounts};

/// Writes the per-run audit files in the log directory.
pub struct RunLogger {
    log_path: PathBuf,
    new_found_path: PathBuf,
    not_found_path: PathBuf,
}

impl RunLogger {
    /// Create the log directory if needed and fix the run timestamp; all
    /// rows of this run land in the same three files.
    pub fn create(log_dir: &Path) -> Result<Self, AuditError> {
        fs::create_dir_all(log_dir)?;
        let start = chrono::Local::now().format("%Y-%m-%d_%H-%M");
        Ok(Self::with_stamp(log_dir, &start.to_string()))
    }

    fn with_stamp(log_dir: &Path, stamp: &str) -> Self {
        Self {
            log_path: log_dir.join(format!("{stamp}_log.csv")),
            new_found_path: log_dir.join(format!("{stamp}_new_found.csv")),
            not_found_path: log_dir.join(format!("{stamp}_not_found.csv")),
        }
    }

    /// Append the run-level summary row for one (venue, year).
    pub fn log_run(
        &mut self,
        proceedings_root: &Path,
        venue: &str,
        year: &str,
        counts: RunCounts,
    ) -> Result<(), AuditError> {
        let root = proceedings_root.display().to_string();
        let by_doi = counts.by_doi.to_string();
        let by_title = counts.by_title.to_string();
        append(
            &self.log_path,
            &[
                root.as_str(),
                venue,
                year,
                by_doi.as_str(),
                "by doi",
                by_title.as_str(),
                "by title",
            ],
        )
    }
}

impl AuditSink for RunLogger {
    fn newly_found(&mut self, bibkey: &str) -> Result<(), AuditError> {
        append(&self.new_found_path, &[bibkey])
    }

    fn not_found(&mut self, record: &PaperRecord) -> Result<(), AuditError> {
        append(
            &self.not_found_path,
            &[
                record.bibkey.as_str(),
                record.title.as_str(),
                record.authors_raw.as_str(),
                record.doi.as_deref().unwrap_or(""),
            ],
        )
    }
}

fn append(path: &Path, fields: &[&str]) -> Result<(), AuditError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(fields)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PaperRecord {
        PaperRecord {
            bibkey: "smith2020deep".into(),
            title: "Deep Learning for Search".into(),
            title_as_filename: "deep_learning_for_search".into(),
            authors: vec!["Jane Smith".into()],
            authors_raw: "Jane Smith".into(),
            doi: Some("10.1/xyz".into()),
            page_span: 9,
        }
    }

    #[test]
    fn run_rows_accumulate_in_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = RunLogger::with_stamp(dir.path(), "2024-01-01_00-00");
        logger
            .log_run(
                Path::new("sources/proceedings-by-venue"),
                "sigir",
                "2020",
                RunCounts { by_doi: 3, by_title: 1 },
            )
            .unwrap();
        logger
            .log_run(
                Path::new("sources/proceedings-by-venue"),
                "sigir",
                "2021",
                RunCounts::default(),
            )
            .unwrap();

        let rows = fs::read_to_string(dir.path().join("2024-01-01_00-00_log.csv")).unwrap();
        let lines: Vec<&str> = rows.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "sources/proceedings-by-venue,sigir,2020,3,by doi,1,by title"
        );
        assert_eq!(
            lines[1],
            "sources/proceedings-by-venue,sigir,2021,0,by doi,0,by title"
        );
    }

    #[test]
    fn newly_found_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = RunLogger::with_stamp(dir.path(), "stamp");
        logger.newly_found("smith2020deep").unwrap();
        logger.newly_found("jones2020other").unwrap();
        let rows = fs::read_to_string(dir.path().join("stamp_new_found.csv")).unwrap();
        assert_eq!(rows, "smith2020deep\njones2020other\n");
    }

    #[test]
    fn not_found_rows_carry_record_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = RunLogger::with_stamp(dir.path(), "stamp");
        logger.not_found(&record()).unwrap();
        let mut no_doi = record();
        no_doi.bibkey = "nodoi".into();
        no_doi.doi = None;
        logger.not_found(&no_doi).unwrap();

        let rows = fs::read_to_string(dir.path().join("stamp_not_found.csv")).unwrap();
        let lines: Vec<&str> = rows.lines().collect();
        assert_eq!(
            lines[0],
            "smith2020deep,Deep Learning for Search,Jane Smith,10.1/xyz"
        );
        assert_eq!(lines[1], "nodoi,Deep Learning for Search,Jane Smith,");
    }

    #[test]
    fn files_are_created_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let _logger = RunLogger::with_stamp(dir.path(), "stamp");
        assert!(!dir.path().join("stamp_log.csv").exists());
        assert!(!dir.path().join("stamp_new_found.csv").exists());
        assert!(!dir.path().join("stamp_not_found.csv").exists());
    }
}
