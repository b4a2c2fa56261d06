//! Per-proceedings-file decision stores.
//!
//! Each proceedings PDF owns two headerless CSV files next to it,
//! `<stem>_found_by_doi.csv` and `<stem>_found_by_title.csv`. Rows are
//! appended one at a time, flushed before scanning continues, so an
//! interrupted run resumes without losing confirmed decisions. The files are
//! only ever appended to by the single run processing their PDF, so no
//! locking is involved.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{MatchDecision, MatchKind, PaperRecord};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One persisted decision, as serialized in the store files.
///
/// Carries more than the engine needs (title, authors) so the files stay
/// human-diffable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRow {
    pub bibkey: String,
    pub title: String,
    pub title_as_filename: String,
    pub authors: String,
    /// Empty string when the record has no DOI.
    pub doi: String,
    /// Relative to the mount point when one is configured.
    pub source_path: String,
    pub first_page: usize,
    pub last_page: usize,
}

/// The pair of append-only decision files belonging to one proceedings PDF.
pub struct MatchDecisionStore {
    by_doi_path: PathBuf,
    by_title_path: PathBuf,
    mount_point: Option<PathBuf>,
}

impl MatchDecisionStore {
    /// Store for the given proceedings file. Paths in rows are stored
    /// relative to `mount_point` and re-joined against it on load, so the
    /// stores survive remounts of the data volume.
    pub fn for_proceedings(pdf_path: &Path, mount_point: Option<&Path>) -> Self {
        Self {
            by_doi_path: sibling(pdf_path, "_found_by_doi.csv"),
            by_title_path: sibling(pdf_path, "_found_by_title.csv"),
            mount_point: mount_point.map(Path::to_path_buf),
        }
    }

    fn path_for(&self, kind: MatchKind) -> &Path {
        match kind {
            MatchKind::Doi => &self.by_doi_path,
            MatchKind::Title => &self.by_title_path,
        }
    }

    /// Read all decisions recorded for `kind`. A missing file is an empty
    /// store, not an error.
    pub fn load(&self, kind: MatchKind) -> Result<Vec<MatchDecision>, StoreError> {
        let path = self.path_for(kind);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        let mut decisions = Vec::new();
        for row in reader.deserialize::<DecisionRow>() {
            decisions.push(self.decision_from_row(kind, row?));
        }
        Ok(decisions)
    }

    /// Append one accepted decision. The row is flushed and the file closed
    /// before this returns.
    pub fn append(
        &self,
        kind: MatchKind,
        record: &PaperRecord,
        decision: &MatchDecision,
    ) -> Result<(), StoreError> {
        let row = DecisionRow {
            bibkey: decision.bibkey.clone(),
            title: record.title.clone(),
            title_as_filename: record.title_as_filename.clone(),
            authors: record.authors_raw.clone(),
            doi: record.doi.clone().unwrap_or_default(),
            source_path: self.relativize(&decision.source_pdf),
            first_page: decision.first_page,
            last_page: decision.last_page,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(kind))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }

    fn decision_from_row(&self, kind: MatchKind, row: DecisionRow) -> MatchDecision {
        let locator = match kind {
            MatchKind::Doi => row.doi,
            MatchKind::Title => row.title_as_filename,
        };
        MatchDecision {
            bibkey: row.bibkey,
            locator,
            source_pdf: self.resolve(&row.source_path),
            first_page: row.first_page,
            last_page: row.last_page,
        }
    }

    fn resolve(&self, stored: &str) -> PathBuf {
        let path = PathBuf::from(stored);
        match &self.mount_point {
            Some(mount) if path.is_relative() => mount.join(path),
            _ => path,
        }
    }

    fn relativize(&self, path: &Path) -> String {
        match &self.mount_point {
            Some(mount) => path.strip_prefix(mount).unwrap_or(path).display().to_string(),
            None => path.display().to_string(),
        }
    }
}

fn sibling(pdf_path: &Path, suffix: &str) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("proceedings");
    pdf_path.with_file_name(format!("{stem}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PaperRecord {
        PaperRecord {
            bibkey: "smith2020deep".into(),
            title: "Deep Learning for Search".into(),
            title_as_filename: "deep_learning_for_search".into(),
            authors: vec!["Jane Smith".into(), "Ada Lovelace".into()],
            authors_raw: "Jane Smith and Ada Lovelace".into(),
            doi: Some("10.1/xyz".into()),
            page_span: 9,
        }
    }

    fn decision(source_pdf: &Path) -> MatchDecision {
        MatchDecision {
            bibkey: "smith2020deep".into(),
            locator: "10.1/xyz".into(),
            source_pdf: source_pdf.to_path_buf(),
            first_page: 5,
            last_page: 14,
        }
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MatchDecisionStore::for_proceedings(&dir.path().join("x.pdf"), None);
        assert!(store.load(MatchKind::Doi).unwrap().is_empty());
        assert!(store.load(MatchKind::Title).unwrap().is_empty());
    }

    #[test]
    fn append_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("sigir-2020-proceedings.pdf");
        let store = MatchDecisionStore::for_proceedings(&pdf, None);
        store.append(MatchKind::Doi, &record(), &decision(&pdf)).unwrap();

        let loaded = store.load(MatchKind::Doi).unwrap();
        assert_eq!(loaded, vec![decision(&pdf)]);
        // the other kind is untouched
        assert!(store.load(MatchKind::Title).unwrap().is_empty());
        assert!(dir
            .path()
            .join("sigir-2020-proceedings_found_by_doi.csv")
            .exists());
    }

    #[test]
    fn append_is_append_only() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("p.pdf");
        let store = MatchDecisionStore::for_proceedings(&pdf, None);
        let mut second = decision(&pdf);
        second.bibkey = "jones2020other".into();
        store.append(MatchKind::Doi, &record(), &decision(&pdf)).unwrap();
        store.append(MatchKind::Doi, &record(), &second).unwrap();
        let loaded = store.load(MatchKind::Doi).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].bibkey, "jones2020other");
    }

    #[test]
    fn title_kind_uses_filename_locator() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("p.pdf");
        let store = MatchDecisionStore::for_proceedings(&pdf, None);
        let mut d = decision(&pdf);
        d.locator = "deep_learning_for_search".into();
        store.append(MatchKind::Title, &record(), &d).unwrap();
        let loaded = store.load(MatchKind::Title).unwrap();
        assert_eq!(loaded[0].locator, "deep_learning_for_search");
    }

    #[test]
    fn mount_point_relativizes_and_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let mount = dir.path().join("mnt");
        let pdf = mount.join("sigir/2020/sigir-2020-proceedings.pdf");
        std::fs::create_dir_all(pdf.parent().unwrap()).unwrap();
        let store = MatchDecisionStore::for_proceedings(&pdf, Some(&mount));
        store.append(MatchKind::Doi, &record(), &decision(&pdf)).unwrap();

        // the stored path is relative to the mount point
        let raw = std::fs::read_to_string(
            pdf.with_file_name("sigir-2020-proceedings_found_by_doi.csv"),
        )
        .unwrap();
        assert!(raw.contains("sigir/2020/sigir-2020-proceedings.pdf"));
        assert!(!raw.contains(mount.to_str().unwrap()));

        // loading re-joins it against the mount point
        let loaded = store.load(MatchKind::Doi).unwrap();
        assert_eq!(loaded[0].source_pdf, pdf);
    }

    #[test]
    fn doi_with_comma_survives_csv() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("p.pdf");
        let store = MatchDecisionStore::for_proceedings(&pdf, None);
        let mut r = record();
        r.doi = Some("10.1/a,b".into());
        let mut d = decision(&pdf);
        d.locator = "10.1/a,b".into();
        store.append(MatchKind::Doi, &r, &d).unwrap();
        let loaded = store.load(MatchKind::Doi).unwrap();
        assert_eq!(loaded[0].locator, "10.1/a,b");
    }
}
