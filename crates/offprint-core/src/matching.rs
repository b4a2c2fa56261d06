//! Page-level match rules.
//!
//! Two rules decide whether a bibliography record is proposed for a page:
//! an exact DOI substring check on line-unwrapped text, and a folded-title
//! substring check. Both only *propose*; a human verdict confirms.

use crate::{MatchKind, PaperRecord};

/// Expand common typographic ligatures found in PDFs.
pub fn expand_ligatures(text: &str) -> String {
    text.replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{FB05}', '\u{FB06}'], "st")
}

/// Fold text for title comparison: ligatures expanded, line breaks and
/// whitespace runs collapsed to single spaces, lowercased.
pub fn fold_for_title(text: &str) -> String {
    expand_ligatures(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One page's text in the forms the match rules consume.
pub struct PreparedPage {
    raw: String,
    /// Line breaks replaced by spaces, nothing else touched. DOI matching
    /// runs on this form: DOIs are case-sensitive.
    no_linebreaks: String,
    folded: String,
}

impl PreparedPage {
    pub fn new(text: String) -> Self {
        let no_linebreaks = text.replace(['\n', '\r'], " ");
        let folded = fold_for_title(&text);
        Self {
            raw: text,
            no_linebreaks,
            folded,
        }
    }

    /// The page text as extracted, for display in the confirmation prompt.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// A record with its title pre-folded for repeated page comparisons.
pub struct Candidate<'a> {
    pub record: &'a PaperRecord,
    folded_title: String,
}

impl<'a> Candidate<'a> {
    pub fn new(record: &'a PaperRecord) -> Self {
        Self {
            folded_title: fold_for_title(&record.title),
            record,
        }
    }

    /// Apply the match rules to one page. The DOI rule is checked first; the
    /// title rule only runs when the DOI rule does not fire. At most one
    /// kind is returned per call.
    pub fn match_page(&self, page: &PreparedPage) -> Option<MatchKind> {
        if let Some(doi) = self.record.doi.as_deref() {
            if page.no_linebreaks.contains(doi) {
                return Some(MatchKind::Doi);
            }
        }
        if !self.folded_title.is_empty() && page.folded.contains(&self.folded_title) {
            return Some(MatchKind::Title);
        }
        None
    }
}
