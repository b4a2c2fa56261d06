use std::path::{Path, PathBuf};

use clap::Parser;

mod console;

use console::ConsolePrompt;
use offprint_bib::ConfBibliography;
use offprint_core::config_file;
use offprint_core::{Config, ExtractionEngine};
use offprint_pdf_mupdf::MupdfBackend;
use offprint_reporting::RunLogger;

/// Extract individual papers from conference-proceedings PDFs by matching
/// bibliography records to their first pages, with human confirmation.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Root of the proceedings tree ({root}/{venue}/{year}/...)
    #[arg(long)]
    proceedings_dir: Option<PathBuf>,

    /// Root of the bibliography tree ({root}/{venue}/{year}/conf-{venue}-{year}.bib)
    #[arg(long)]
    bibliography_dir: Option<PathBuf>,

    /// Base of the output trees ({base}-by-doi, {base}-by-title)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Directory for the timestamped run audit files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Mount-point prefix stripped from source paths in the decision stores
    #[arg(long)]
    mount_point: Option<PathBuf>,

    /// Only process this venue
    #[arg(long)]
    venue: Option<String>,

    /// Only process this year (requires --venue)
    #[arg(long, requires = "venue")]
    year: Option<String>,

    /// Trial run: suffix output roots with -test
    #[arg(long)]
    test: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = resolve_config(&args);

    if !config.proceedings_dir.is_dir() {
        anyhow::bail!(
            "proceedings directory not found: {}",
            config.proceedings_dir.display()
        );
    }

    let pairs = match (&args.venue, &args.year) {
        (Some(venue), Some(year)) => vec![(venue.clone(), year.clone())],
        (Some(venue), None) => discover_years(&config.proceedings_dir, venue)?,
        _ => discover_pairs(&config.proceedings_dir)?,
    };

    let bibliography = ConfBibliography::new(config.bibliography_dir.clone());
    let backend = MupdfBackend::new();
    let mut prompt = ConsolePrompt::new(!args.no_color);
    let mut logger = RunLogger::create(&config.log_dir)?;

    for (venue, year) in pairs {
        let counts =
            ExtractionEngine::new(&config, &bibliography, &backend, &mut prompt, &mut logger)
                .run(&venue, &year)?;
        logger.log_run(&config.proceedings_dir, &venue, &year, counts)?;
    }

    Ok(())
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
fn resolve_config(args: &Args) -> Config {
    let file = config_file::load_config();
    let paths = file.paths.unwrap_or_default();
    let run = file.run.unwrap_or_default();
    let defaults = Config::default();

    let resolve_path = |flag: &Option<PathBuf>,
                        env: &str,
                        file_value: &Option<String>,
                        default: &Path|
     -> PathBuf {
        flag.clone()
            .or_else(|| std::env::var(env).ok().map(PathBuf::from))
            .or_else(|| file_value.clone().map(PathBuf::from))
            .unwrap_or_else(|| default.to_path_buf())
    };

    Config {
        proceedings_dir: resolve_path(
            &args.proceedings_dir,
            "OFFPRINT_PROCEEDINGS_DIR",
            &paths.proceedings_dir,
            &defaults.proceedings_dir,
        ),
        bibliography_dir: resolve_path(
            &args.bibliography_dir,
            "OFFPRINT_BIBLIOGRAPHY_DIR",
            &paths.bibliography_dir,
            &defaults.bibliography_dir,
        ),
        output_dir: resolve_path(
            &args.output_dir,
            "OFFPRINT_OUTPUT_DIR",
            &paths.output_dir,
            &defaults.output_dir,
        ),
        log_dir: resolve_path(
            &args.log_dir,
            "OFFPRINT_LOG_DIR",
            &paths.log_dir,
            &defaults.log_dir,
        ),
        mount_point: args
            .mount_point
            .clone()
            .or_else(|| std::env::var("OFFPRINT_MOUNT_POINT").ok().map(PathBuf::from))
            .or_else(|| paths.mount_point.map(PathBuf::from)),
        test_mode: args.test
            || std::env::var("OFFPRINT_TEST_MODE")
                .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            || run.test_mode.unwrap_or(false),
    }
}

/// All (venue, year) pairs under the proceedings root, in sorted order.
fn discover_pairs(root: &Path) -> anyhow::Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for venue in sorted_subdirs(root)? {
        for year in sorted_subdirs(&root.join(&venue))? {
            pairs.push((venue.clone(), year));
        }
    }
    Ok(pairs)
}

/// All years for one venue, in sorted order.
fn discover_years(root: &Path, venue: &str) -> anyhow::Result<Vec<(String, String)>> {
    let dir = root.join(venue);
    if !dir.is_dir() {
        anyhow::bail!("venue directory not found: {}", dir.display());
    }
    Ok(sorted_subdirs(&dir)?
        .into_iter()
        .map(|year| (venue.to_string(), year))
        .collect())
}

fn sorted_subdirs(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_pairs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for path in [
            "sigir/2021",
            "sigir/2019",
            "cikm/2020",
            "ecir/2020",
        ] {
            std::fs::create_dir_all(dir.path().join(path)).unwrap();
        }
        // stray files are ignored
        std::fs::write(dir.path().join("README.txt"), b"").unwrap();

        let pairs = discover_pairs(dir.path()).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("cikm".to_string(), "2020".to_string()),
                ("ecir".to_string(), "2020".to_string()),
                ("sigir".to_string(), "2019".to_string()),
                ("sigir".to_string(), "2021".to_string()),
            ]
        );
    }

    #[test]
    fn discover_years_for_one_venue() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sigir/2020")).unwrap();
        std::fs::create_dir_all(dir.path().join("sigir/2018")).unwrap();
        std::fs::create_dir_all(dir.path().join("cikm/2020")).unwrap();

        let pairs = discover_years(dir.path(), "sigir").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("sigir".to_string(), "2018".to_string()),
                ("sigir".to_string(), "2020".to_string()),
            ]
        );
    }
}
