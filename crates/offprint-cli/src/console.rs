//! Interactive console confirmation.
//!
//! Renders the proposed record and the page text with the spans that justify
//! the proposal highlighted, then blocks for a `y`/`n`/`i` verdict.
//! Highlighting is a best-effort aid for the reviewer: any pattern failure
//! falls back to the ligature-expanded page text and never aborts the run.

use std::io::{self, BufRead, Write};

use once_cell::sync::Lazy;
use owo_colors::OwoColorize;
use regex::{Regex, RegexBuilder};

use offprint_core::matching::expand_ligatures;
use offprint_core::{ConfirmationPrompt, PaperRecord, Verdict};

static INTRODUCTION_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new("introduction")
        .case_insensitive(true)
        .build()
        .unwrap()
});

static ABSTRACT_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new("abstract")
        .case_insensitive(true)
        .build()
        .unwrap()
});

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Console prompt: clears the screen, shows the proposed record above the
/// highlighted page text, and reads the verdict from stdin.
pub struct ConsolePrompt {
    color: ColorMode,
}

impl ConsolePrompt {
    pub fn new(use_color: bool) -> Self {
        Self {
            color: ColorMode(use_color),
        }
    }
}

impl ConfirmationPrompt for ConsolePrompt {
    fn confirm(&mut self, record: &PaperRecord, page_text: &str) -> io::Result<Verdict> {
        let stdout = io::stdout();
        let mut out = stdout.lock();

        // clear screen + cursor home
        write!(out, "\x1b[2J\x1b[H")?;

        let authors = record.authors.join(", ");
        let doi = record.doi.as_deref().unwrap_or("-");
        if self.color.enabled() {
            writeln!(out, "{}: {}", "TITLE".underline(), record.title.blue())?;
            writeln!(out, "{}: {}", "AUTHORS".underline(), authors.green())?;
            writeln!(out, "{}: {}", "DOI".underline(), doi.yellow())?;
            writeln!(out)?;
            writeln!(out, "{}", highlight_page(page_text, record).trim())?;
        } else {
            writeln!(out, "TITLE: {}", record.title)?;
            writeln!(out, "AUTHORS: {}", authors)?;
            writeln!(out, "DOI: {}", doi)?;
            writeln!(out)?;
            writeln!(out, "{}", expand_ligatures(page_text).trim())?;
        }
        writeln!(out)?;

        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            write!(
                out,
                "Enter 'y' if correct; 'n' if wrong paper; 'i' if table of contents, reference page, etc. to skip this page. "
            )?;
            out.flush()?;
            line.clear();
            if stdin.lock().read_line(&mut line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stdin closed while waiting for a verdict",
                ));
            }
            match line.trim() {
                "y" => return Ok(Verdict::Accept),
                "n" => return Ok(Verdict::Reject),
                "i" => return Ok(Verdict::SkipPage),
                _ => {}
            }
        }
    }
}

/// Best-effort highlighting of the spans that justify the proposed match.
pub fn highlight_page(page_text: &str, record: &PaperRecord) -> String {
    let expanded = expand_ligatures(page_text);
    try_highlight(&expanded, record).unwrap_or(expanded)
}

fn try_highlight(text: &str, record: &PaperRecord) -> Option<String> {
    let mut text = highlight_title(text, &record.title)?;
    if let Some(doi) = record.doi.as_deref() {
        text = text.replace(doi, &doi.yellow().to_string());
    }
    for author in &record.authors {
        text = highlight_author(&text, author)?;
    }
    text = paint_first(&INTRODUCTION_RE, &text, |m| m.red().to_string());
    text = paint_first(&ABSTRACT_RE, &text, |m| m.red().to_string());
    Some(text)
}

/// Mark the title span, tolerating line wraps between its words.
fn highlight_title(text: &str, title: &str) -> Option<String> {
    let words: Vec<String> = title.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return Some(text.to_string());
    }
    let re = RegexBuilder::new(&words.join(r"[ \n]+"))
        .case_insensitive(true)
        .build()
        .ok()?;
    Some(paint_first(&re, text, |m| m.blue().to_string()))
}

/// Mark one author: "first … last" span, then "initial [.] last", then the
/// bare last name.
fn highlight_author(text: &str, author: &str) -> Option<String> {
    let tokens: Vec<&str> = author.split_whitespace().collect();
    let (Some(&first), Some(&last)) = (tokens.first(), tokens.last()) else {
        return Some(text.to_string());
    };
    let mut text = text.to_string();
    if first != last {
        let re = RegexBuilder::new(&format!("{}.*?{}", regex::escape(first), regex::escape(last)))
            .case_insensitive(true)
            .build()
            .ok()?;
        text = paint_first(&re, &text, |m| m.green().to_string());

        let initial = first.chars().next()?;
        let re = RegexBuilder::new(&format!(
            "{}[. ]*{}",
            regex::escape(&initial.to_string()),
            regex::escape(last)
        ))
        .case_insensitive(true)
        .build()
        .ok()?;
        text = paint_first(&re, &text, |m| m.green().to_string());
    }
    let re = RegexBuilder::new(&regex::escape(last))
        .case_insensitive(true)
        .build()
        .ok()?;
    Some(paint_first(&re, &text, |m| m.green().to_string()))
}

/// Replace the first match with its painted form.
fn paint_first(re: &Regex, text: &str, paint: impl Fn(&str) -> String) -> String {
    match re.find(text) {
        Some(m) => format!(
            "{}{}{}",
            &text[..m.start()],
            paint(m.as_str()),
            &text[m.end()..]
        ),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, authors: &[&str], doi: Option<&str>) -> PaperRecord {
        PaperRecord {
            bibkey: "key".into(),
            title: title.into(),
            title_as_filename: String::new(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            authors_raw: authors.join(" and "),
            doi: doi.map(String::from),
            page_span: 0,
        }
    }

    #[test]
    fn title_span_is_marked_across_line_wraps() {
        let r = record("Deep Learning for Search", &[], None);
        let page = "Deep Learning\nfor Search\nJane Smith";
        let out = highlight_page(page, &r);
        assert!(out.contains("\x1b["));
        // the wrapped span is painted as a whole
        assert!(out.contains("Deep Learning\nfor Search\u{1b}"));
    }

    #[test]
    fn doi_and_keywords_are_marked() {
        let r = record("Some Paper", &[], Some("10.1/xyz"));
        let out = highlight_page("Abstract\n10.1/xyz\n1 Introduction", &r);
        let plain = strip_ansi(&out);
        assert_eq!(plain, "Abstract\n10.1/xyz\n1 Introduction");
        assert!(out.matches("\x1b[").count() >= 3);
    }

    #[test]
    fn author_fallback_passes_mark_last_name() {
        let r = record("Some Paper", &["Jane Smith"], None);
        let out = highlight_page("by J. Smith et al.", &r);
        assert!(out.contains("\x1b["));
        assert!(strip_ansi(&out).contains("J. Smith"));
    }

    #[test]
    fn pathological_title_never_panics() {
        let r = record("a(b [c{ *+?|^$ .\\d", &["x(y"], Some("10.1/(("));
        let page = "some page text a(b [c{ *+?|^$ .\\d more";
        let out = highlight_page(page, &r);
        // escaped patterns still match literally; at minimum the text survives
        assert!(strip_ansi(&out).contains("*+?|^$"));
    }

    #[test]
    fn ligatures_are_expanded_even_without_matches() {
        let r = record("Unrelated Title", &[], None);
        let out = highlight_page("eﬃcient oﬄine ﬁndings", &r);
        assert_eq!(strip_ansi(&out), "efficient offline findings");
    }

    fn strip_ansi(s: &str) -> String {
        static ANSI_RE: Lazy<Regex> = Lazy::new(|| Regex::new("\x1b\\[[0-9;]*m").unwrap());
        ANSI_RE.replace_all(s, "").to_string()
    }
}
