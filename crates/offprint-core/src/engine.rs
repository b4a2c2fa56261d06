//! Batch extraction driver.
//!
//! One [`ExtractionEngine::run`] call processes a single (venue, year) pair:
//! load the bibliography, scan every proceedings file page by page, ask the
//! human to confirm each proposed match, persist accepted decisions as they
//! happen, then cut one output PDF per resolved record. Decisions reloaded
//! from earlier runs are never re-asked and existing output files are never
//! overwritten, so re-running a batch is idempotent.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::audit::{AuditError, AuditSink};
use crate::backend::{BackendError, PdfBackend};
use crate::config::Config;
use crate::matching::{Candidate, PreparedPage};
use crate::prompt::{ConfirmationPrompt, Verdict};
use crate::source::{BibliographySource, SourceError};
use crate::store::{MatchDecisionStore, StoreError};
use crate::{MatchDecision, MatchKind, PaperRecord};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bibliography error: {0}")]
    Source(#[from] SourceError),
    #[error("PDF backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("decision store error: {0}")]
    Store(#[from] StoreError),
    #[error("audit error: {0}")]
    Audit(#[from] AuditError),
    #[error("confirmation prompt error: {0}")]
    Prompt(std::io::Error),
}

/// How many records each rule resolved for one (venue, year), including
/// decisions reloaded from earlier runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub by_doi: usize,
    pub by_title: usize,
}

pub struct ExtractionEngine<'a> {
    config: &'a Config,
    bibliography: &'a dyn BibliographySource,
    backend: &'a dyn PdfBackend,
    prompt: &'a mut dyn ConfirmationPrompt,
    audit: &'a mut dyn AuditSink,
}

impl<'a> ExtractionEngine<'a> {
    pub fn new(
        config: &'a Config,
        bibliography: &'a dyn BibliographySource,
        backend: &'a dyn PdfBackend,
        prompt: &'a mut dyn ConfirmationPrompt,
        audit: &'a mut dyn AuditSink,
    ) -> Self {
        Self {
            config,
            bibliography,
            backend,
            prompt,
            audit,
        }
    }

    /// Process one (venue, year) pair end to end.
    pub fn run(&mut self, venue: &str, year: &str) -> Result<RunCounts, EngineError> {
        let Some(records) = self.bibliography.load(venue, year)? else {
            tracing::info!(venue, year, "no bibliography, skipping");
            return Ok(RunCounts::default());
        };
        tracing::info!(venue, year, records = records.len(), "processing");

        let mut found_by_doi: BTreeMap<String, MatchDecision> = BTreeMap::new();
        let mut found_by_title: BTreeMap<String, MatchDecision> = BTreeMap::new();

        for pdf_path in self.proceedings_files(venue, year)? {
            self.scan_proceedings(&pdf_path, &records, &mut found_by_doi, &mut found_by_title)?;
        }

        for record in &records {
            if !found_by_doi.contains_key(&record.bibkey)
                && !found_by_title.contains_key(&record.bibkey)
            {
                self.audit.not_found(record)?;
            }
        }

        self.materialize(venue, year, MatchKind::Doi, &found_by_doi)?;
        self.materialize(venue, year, MatchKind::Title, &found_by_title)?;

        Ok(RunCounts {
            by_doi: found_by_doi.len(),
            by_title: found_by_title.len(),
        })
    }

    /// Proceedings PDFs for one venue/year, in sorted order.
    fn proceedings_files(&self, venue: &str, year: &str) -> Result<Vec<PathBuf>, EngineError> {
        let dir = self.config.proceedings_dir_for(venue, year);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let prefix = format!("{venue}-{year}-proceedings");
        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with(&prefix) && name.ends_with(".pdf") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn scan_proceedings(
        &mut self,
        pdf_path: &Path,
        records: &[PaperRecord],
        found_by_doi: &mut BTreeMap<String, MatchDecision>,
        found_by_title: &mut BTreeMap<String, MatchDecision>,
    ) -> Result<(), EngineError> {
        let store =
            MatchDecisionStore::for_proceedings(pdf_path, self.config.mount_point.as_deref());
        for decision in store.load(MatchKind::Doi)? {
            found_by_doi.insert(decision.bibkey.clone(), decision);
        }
        for decision in store.load(MatchKind::Title)? {
            found_by_title.insert(decision.bibkey.clone(), decision);
        }

        let candidates: Vec<Candidate> = records.iter().map(Candidate::new).collect();

        let pages = self.backend.page_texts(pdf_path)?;
        tracing::debug!(path = %pdf_path.display(), pages = pages.len(), "scanning proceedings");

        for (page_index, text) in pages.into_iter().enumerate() {
            let page = PreparedPage::new(text);
            'records: for candidate in &candidates {
                let record = candidate.record;
                if found_by_doi.contains_key(&record.bibkey)
                    || found_by_title.contains_key(&record.bibkey)
                {
                    continue;
                }
                let Some(kind) = candidate.match_page(&page) else {
                    continue;
                };
                match self
                    .prompt
                    .confirm(record, page.raw())
                    .map_err(EngineError::Prompt)?
                {
                    Verdict::Accept => {
                        let decision = MatchDecision {
                            bibkey: record.bibkey.clone(),
                            locator: record.locator(kind).to_string(),
                            source_pdf: pdf_path.to_path_buf(),
                            first_page: page_index,
                            last_page: page_index + record.page_span as usize,
                        };
                        store.append(kind, record, &decision)?;
                        match kind {
                            MatchKind::Doi => {
                                found_by_doi.insert(record.bibkey.clone(), decision)
                            }
                            MatchKind::Title => {
                                found_by_title.insert(record.bibkey.clone(), decision)
                            }
                        };
                    }
                    Verdict::Reject => {}
                    Verdict::SkipPage => break 'records,
                }
            }
        }
        Ok(())
    }

    /// Cut one output PDF per decision, skipping files that already exist.
    fn materialize(
        &mut self,
        venue: &str,
        year: &str,
        kind: MatchKind,
        decisions: &BTreeMap<String, MatchDecision>,
    ) -> Result<(), EngineError> {
        let root = self.config.output_root(kind).join(venue).join(year);
        for decision in decisions.values() {
            // a DOI locator may contain '/', creating extra directory levels
            let target = root.join(format!("{}.pdf", decision.locator));
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            if target.exists() {
                tracing::debug!(target = %target.display(), "output exists, skipping");
                continue;
            }
            self.backend.extract_page_range(
                &decision.source_pdf,
                decision.first_page,
                decision.last_page,
                &target,
            )?;
            self.audit.newly_found(&decision.bibkey)?;
            tracing::info!(bibkey = %decision.bibkey, target = %target.display(), "extracted");
        }
        Ok(())
    }
}
