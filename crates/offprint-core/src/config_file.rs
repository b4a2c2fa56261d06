use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub paths: Option<PathsConfig>,
    pub run: Option<RunConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    pub proceedings_dir: Option<String>,
    pub bibliography_dir: Option<String>,
    pub output_dir: Option<String>,
    pub log_dir: Option<String>,
    pub mount_point: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    pub test_mode: Option<bool>,
}

/// Platform config directory path: `<config_dir>/offprint/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("offprint").join("config.toml"))
}

/// Load config by cascading CWD `.offprint.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".offprint.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_paths = base.paths.unwrap_or_default();
    let over_paths = overlay.paths.unwrap_or_default();
    let base_run = base.run.unwrap_or_default();
    let over_run = overlay.run.unwrap_or_default();
    ConfigFile {
        paths: Some(PathsConfig {
            proceedings_dir: over_paths.proceedings_dir.or(base_paths.proceedings_dir),
            bibliography_dir: over_paths.bibliography_dir.or(base_paths.bibliography_dir),
            output_dir: over_paths.output_dir.or(base_paths.output_dir),
            log_dir: over_paths.log_dir.or(base_paths.log_dir),
            mount_point: over_paths.mount_point.or(base_paths.mount_point),
        }),
        run: Some(RunConfig {
            test_mode: over_run.test_mode.or(base_run.test_mode),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_partial_config() {
        let parsed: ConfigFile = toml::from_str(
            r#"
            [paths]
            output_dir = "out/papers"
            "#,
        )
        .unwrap();
        let paths = parsed.paths.unwrap();
        assert_eq!(paths.output_dir.as_deref(), Some("out/papers"));
        assert!(paths.proceedings_dir.is_none());
        assert!(parsed.run.is_none());
    }

    #[test]
    fn merge_overlay_wins() {
        let base: ConfigFile = toml::from_str(
            r#"
            [paths]
            output_dir = "base-out"
            log_dir = "base-logs"
            [run]
            test_mode = false
            "#,
        )
        .unwrap();
        let overlay: ConfigFile = toml::from_str(
            r#"
            [paths]
            output_dir = "overlay-out"
            [run]
            test_mode = true
            "#,
        )
        .unwrap();
        let merged = merge(base, overlay);
        let paths = merged.paths.unwrap();
        assert_eq!(paths.output_dir.as_deref(), Some("overlay-out"));
        assert_eq!(paths.log_dir.as_deref(), Some("base-logs"));
        assert_eq!(merged.run.unwrap().test_mode, Some(true));
    }
}
