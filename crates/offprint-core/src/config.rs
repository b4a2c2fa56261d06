use std::path::PathBuf;

use crate::MatchKind;

/// Run configuration for one extraction batch.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the proceedings tree: `{root}/{venue}/{year}/…`.
    pub proceedings_dir: PathBuf,
    /// Root of the bibliography tree: `{root}/{venue}/{year}/conf-{venue}-{year}.bib`.
    pub bibliography_dir: PathBuf,
    /// Base of the output trees; `-by-doi` / `-by-title` are appended.
    pub output_dir: PathBuf,
    /// Directory for the timestamped run audit files.
    pub log_dir: PathBuf,
    /// Prefix stripped from source paths before persisting store rows and
    /// re-joined on load, so the stores survive remounts of the data volume.
    pub mount_point: Option<PathBuf>,
    /// Suffix output roots with `-test` so trial runs never touch real data.
    pub test_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proceedings_dir: PathBuf::from("sources/proceedings-by-venue"),
            bibliography_dir: PathBuf::from("sources/bibliography-by-venue"),
            output_dir: PathBuf::from("output/papers-by-venue-extracted"),
            log_dir: PathBuf::from("extraction_logs"),
            mount_point: None,
            test_mode: false,
        }
    }
}

impl Config {
    /// Root of the output tree for one match kind, e.g.
    /// `output/papers-by-venue-extracted-by-doi[-test]`.
    pub fn output_root(&self, kind: MatchKind) -> PathBuf {
        let suffix = if self.test_mode { "-test" } else { "" };
        PathBuf::from(format!(
            "{}-by-{}{}",
            self.output_dir.display(),
            kind.as_str(),
            suffix
        ))
    }

    /// Directory holding one venue/year's proceedings files.
    pub fn proceedings_dir_for(&self, venue: &str, year: &str) -> PathBuf {
        self.proceedings_dir.join(venue).join(year)
    }
}
