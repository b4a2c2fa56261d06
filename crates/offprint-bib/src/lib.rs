//! Bibliography loading for proceedings extraction.
//!
//! Turns `.bib` entries into match-ready [`PaperRecord`]s. Entries without a
//! usable page range are dropped here: a record cannot be extracted without
//! knowing how many pages to cut.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use offprint_core::{BibliographySource, PaperRecord, SourceError};

/// Failure to derive a page span from a bibliography `pages` field.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PageRangeError {
    #[error("empty page range")]
    Empty,
    #[error("non-numeric page bound: {0}")]
    NonNumeric(String),
    #[error("backwards page range: {0}")]
    Backwards(String),
}

/// Bibliography tree rooted at `{root}/{venue}/{year}/conf-{venue}-{year}.bib`.
pub struct ConfBibliography {
    root: PathBuf,
}

impl ConfBibliography {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn bib_path(&self, venue: &str, year: &str) -> PathBuf {
        self.root
            .join(venue)
            .join(year)
            .join(format!("conf-{venue}-{year}.bib"))
    }
}

impl BibliographySource for ConfBibliography {
    fn load(&self, venue: &str, year: &str) -> Result<Option<Vec<PaperRecord>>, SourceError> {
        let path = self.bib_path(venue, year);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let records = load_records_str(&content)?;
        tracing::debug!(path = %path.display(), records = records.len(), "loaded bibliography");
        Ok(Some(records))
    }
}

/// Parse `.bib` content into match-ready records, in source order.
pub fn load_records_str(content: &str) -> Result<Vec<PaperRecord>, SourceError> {
    // Fast path: parse the whole file.
    if let Ok(bibliography) = biblatex::Bibliography::parse(content) {
        let entries: Vec<_> = bibliography.iter().collect();
        return Ok(records_from_entries(&entries));
    }

    // Fallback: split by @ entries and parse each individually. Real .bib
    // files often have minor syntax errors (extra braces, non-standard entry
    // types, raw text separators) that fail the whole-file parse; by parsing
    // each entry independently we recover whatever we can.
    static ENTRY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^@[a-zA-Z]").unwrap());
    let positions: Vec<usize> = ENTRY_RE.find_iter(content).map(|m| m.start()).collect();
    if positions.is_empty() {
        return Err(SourceError::Malformed("no bibliography entries found".into()));
    }

    let mut parsed_bibs = Vec::new();
    for (i, &start) in positions.iter().enumerate() {
        let end = positions.get(i + 1).copied().unwrap_or(content.len());
        if let Ok(bib) = biblatex::Bibliography::parse(&content[start..end]) {
            parsed_bibs.push(bib);
        }
    }

    let entries: Vec<_> = parsed_bibs.iter().flat_map(|b| b.iter()).collect();
    if entries.is_empty() {
        return Err(SourceError::Malformed("no bibliography entries parsed".into()));
    }
    Ok(records_from_entries(&entries))
}

fn records_from_entries(entries: &[&biblatex::Entry]) -> Vec<PaperRecord> {
    entries.iter().filter_map(|entry| build_record(entry)).collect()
}

/// Build one record; `None` when the entry has no title or no usable page
/// range.
fn build_record(entry: &biblatex::Entry) -> Option<PaperRecord> {
    let title = entry
        .title()
        .ok()
        .map(chunks_to_string)
        .filter(|t| !t.is_empty())?;

    let pages = entry.get("pages").map(chunks_to_string);
    let page_span = match page_span(pages.as_deref().unwrap_or("")) {
        Ok(span) => span,
        Err(err) => {
            tracing::debug!(key = %entry.key, %err, "dropping entry without usable page range");
            return None;
        }
    };

    let authors: Vec<String> = entry
        .author()
        .unwrap_or_default()
        .into_iter()
        .filter(|p| p.name != "others")
        .filter(|p| !p.name.is_empty() || !p.given_name.is_empty())
        .map(|p| format_person(&p))
        .collect();
    let authors_raw = authors.join(" and ");

    let doi = entry
        .get("doi")
        .map(chunks_to_string)
        .map(|d| d.replace('\\', ""))
        .filter(|d| !d.is_empty());

    Some(PaperRecord {
        bibkey: entry.key.clone(),
        title_as_filename: title_to_filename(&title),
        title,
        authors,
        authors_raw,
        doi,
        page_span,
    })
}

/// Convert biblatex chunks to a plain string.
fn chunks_to_string(chunks: &[biblatex::Spanned<biblatex::Chunk>]) -> String {
    chunks
        .iter()
        .map(|c| match &c.v {
            biblatex::Chunk::Normal(s) => s.as_str(),
            biblatex::Chunk::Verbatim(s) => s.as_str(),
            biblatex::Chunk::Math(s) => s.as_str(),
        })
        .collect::<Vec<_>>()
        .join("")
}

/// Format a biblatex Person as "Given Family" (western name order).
fn format_person(p: &biblatex::Person) -> String {
    let mut parts = Vec::new();
    if !p.given_name.is_empty() {
        parts.push(p.given_name.as_str());
    }
    if !p.prefix.is_empty() {
        parts.push(p.prefix.as_str());
    }
    if !p.name.is_empty() {
        parts.push(p.name.as_str());
    }
    if !p.suffix.is_empty() {
        parts.push(p.suffix.as_str());
    }
    parts.join(" ")
}

/// Number of pages after the first, from a `pages` field like `"123--145"`.
///
/// A single page number yields 0. Backwards ranges are rejected: a negative
/// span could only produce an empty or reversed extraction range.
pub fn page_span(pages: &str) -> Result<u32, PageRangeError> {
    if pages.is_empty() {
        return Err(PageRangeError::Empty);
    }
    match pages.split_once("--") {
        None => pages
            .trim()
            .parse::<u32>()
            .map(|_| 0)
            .map_err(|_| PageRangeError::NonNumeric(pages.to_string())),
        Some((first, last)) => {
            let first: u32 = first
                .trim()
                .parse()
                .map_err(|_| PageRangeError::NonNumeric(pages.to_string()))?;
            let last: u32 = last
                .trim()
                .parse()
                .map_err(|_| PageRangeError::NonNumeric(pages.to_string()))?;
            last.checked_sub(first)
                .ok_or_else(|| PageRangeError::Backwards(pages.to_string()))
        }
    }
}

/// Build a filesystem-safe, human-recognizable file name from a title.
///
/// Keeps only letters and spaces, folds accented letters to their ASCII base
/// letter (NFD decomposition, combining marks dropped), collapses whitespace
/// runs to single underscores, and lowercases.
pub fn title_to_filename(title: &str) -> String {
    let mut kept = String::with_capacity(title.len());
    for c in title.chars() {
        if c == ' ' {
            kept.push(' ');
        } else if c.is_alphabetic() {
            for d in std::iter::once(c).nfd() {
                if d.is_ascii_alphabetic() {
                    kept.push(d);
                }
            }
        }
    }
    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}
