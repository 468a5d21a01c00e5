//! Scorecard configuration.
//!
//! Configuration is a YAML file resolved in priority order:
//! 1. an explicit `--config` path
//! 2. the path in `$REPO_SCORECARD_CONFIG`
//! 3. `.repo-scorecard/config.yaml` in the working directory
//! 4. `$XDG_CONFIG_HOME/repo-scorecard/config.yaml` (`~/.config` when unset)
//!
//! When none exists the built-in defaults apply.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV_VAR: &str = "REPO_SCORECARD_CONFIG";

/// Project-local configuration directory.
pub const PROJECT_CONFIG_DIR: &str = ".repo-scorecard";

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

const APP_DIR: &str = "repo-scorecard";

/// Settings of a scorecard run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScorecardConfig {
    /// Directory holding clones as `owner/name`.
    pub repos_root: PathBuf,
    /// Issue-tracker export.
    pub issue_store: PathBuf,
    /// Where records are written.
    pub record_store: PathBuf,
    /// Repositories analysed at the same time.
    pub concurrency: usize,
    /// Per-repository time limit in seconds.
    pub timeout_secs: u64,
    /// Attempts per record write.
    pub sink_retries: u32,
    /// Recent commits checked for TDD keywords.
    pub tdd_window: usize,
    /// Maximum commits read per repository.
    pub commit_cap: Option<usize>,
    /// Collect per-commit line statistics.
    pub line_stats: bool,
}

impl Default for ScorecardConfig {
    fn default() -> Self {
        Self {
            repos_root: PathBuf::from("repos"),
            issue_store: PathBuf::from("issues.json"),
            record_store: PathBuf::from("scorecard.json"),
            concurrency: 4,
            timeout_secs: 120,
            sink_retries: 3,
            tdd_window: crate::testing::DEFAULT_TDD_WINDOW,
            commit_cap: None,
            line_stats: false,
        }
    }
}

impl ScorecardConfig {
    /// Reads a configuration file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.sink_retries == 0 {
            bail!("sink_retries must be at least 1");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Per-repository time limit.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`.
    Explicit(PathBuf),
    /// Named by [`CONFIG_ENV_VAR`].
    Environment(PathBuf),
    /// Found in the project directory.
    Project(PathBuf),
    /// Found in the XDG config directory.
    Xdg(PathBuf),
    /// No file; built-in defaults.
    Defaults,
}

impl ConfigSource {
    /// Returns the file to read, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Environment(p) | Self::Project(p) | Self::Xdg(p) => Some(p),
            Self::Defaults => None,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(p) => write!(f, "Explicit: {}", p.display()),
            Self::Environment(p) => write!(f, "{CONFIG_ENV_VAR}: {}", p.display()),
            Self::Project(p) => write!(f, "Project: {}", p.display()),
            Self::Xdg(p) => write!(f, "Global (XDG): {}", p.display()),
            Self::Defaults => write!(f, "(built-in defaults)"),
        }
    }
}

/// Returns `$XDG_CONFIG_HOME/repo-scorecard`, or `~/.config/repo-scorecard`.
fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_home.is_empty() {
            return Some(PathBuf::from(xdg_home).join(APP_DIR));
        }
    }

    dirs::home_dir().map(|home| home.join(".config").join(APP_DIR))
}

/// Picks the configuration source from explicit inputs.
fn resolve_source(
    explicit: Option<&Path>,
    env_path: Option<PathBuf>,
    project_dir: &Path,
    xdg_dir: Option<PathBuf>,
) -> ConfigSource {
    if let Some(path) = explicit {
        return ConfigSource::Explicit(path.to_path_buf());
    }

    if let Some(path) = env_path.filter(|p| !p.as_os_str().is_empty()) {
        return ConfigSource::Environment(path);
    }

    let project_path = project_dir.join(PROJECT_CONFIG_DIR).join(CONFIG_FILE_NAME);
    if project_path.exists() {
        return ConfigSource::Project(project_path);
    }

    if let Some(xdg_path) = xdg_dir.map(|d| d.join(CONFIG_FILE_NAME)) {
        if xdg_path.exists() {
            return ConfigSource::Xdg(xdg_path);
        }
    }

    ConfigSource::Defaults
}

/// Resolves the configuration source for a run in `project_dir`.
pub fn resolve_config_source(explicit: Option<&Path>, project_dir: &Path) -> ConfigSource {
    let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
    resolve_source(explicit, env_path, project_dir, xdg_config_dir())
}

/// Loads the effective configuration.
///
/// Explicit and environment paths must exist; discovered files are optional.
pub fn load_config(explicit: Option<&Path>, project_dir: &Path) -> Result<(ScorecardConfig, ConfigSource)> {
    let source = resolve_config_source(explicit, project_dir);
    debug!(source = %source, "resolved configuration");

    let config = match source.path() {
        Some(path) => ScorecardConfig::load_from_path(path)?,
        None => ScorecardConfig::default(),
    };
    Ok((config, source))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = ScorecardConfig::default();
        assert_eq!(config.repos_root, PathBuf::from("repos"));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert_eq!(config.sink_retries, 3);
        assert_eq!(config.tdd_window, 20);
        assert!(config.commit_cap.is_none());
        assert!(!config.line_stats);
        config.validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "concurrency: 8\ncommit_cap: 500\n").unwrap();

        let config = ScorecardConfig::load_from_path(&path).unwrap();
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.commit_cap, Some(500));
        assert_eq!(config.sink_retries, 3);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "concurency: 8\n").unwrap();
        assert!(ScorecardConfig::load_from_path(&path).is_err());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "concurrency: 0\n").unwrap();
        let err = ScorecardConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn explicit_wins_over_everything() {
        let dir = TempDir::new().unwrap();
        let source = resolve_source(
            Some(Path::new("/etc/custom.yaml")),
            Some(PathBuf::from("/env.yaml")),
            dir.path(),
            None,
        );
        assert_eq!(source, ConfigSource::Explicit(PathBuf::from("/etc/custom.yaml")));
    }

    #[test]
    fn environment_before_project() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(PROJECT_CONFIG_DIR)).unwrap();
        fs::write(dir.path().join(PROJECT_CONFIG_DIR).join(CONFIG_FILE_NAME), "").unwrap();

        let source = resolve_source(None, Some(PathBuf::from("/env.yaml")), dir.path(), None);
        assert_eq!(source, ConfigSource::Environment(PathBuf::from("/env.yaml")));

        let source = resolve_source(None, None, dir.path(), None);
        assert!(matches!(source, ConfigSource::Project(_)));
    }

    #[test]
    fn xdg_then_defaults() {
        let project = TempDir::new().unwrap();
        let xdg = TempDir::new().unwrap();

        let source = resolve_source(None, None, project.path(), Some(xdg.path().to_path_buf()));
        assert_eq!(source, ConfigSource::Defaults);
        assert_eq!(source.to_string(), "(built-in defaults)");

        fs::write(xdg.path().join(CONFIG_FILE_NAME), "line_stats: true\n").unwrap();
        let source = resolve_source(None, None, project.path(), Some(xdg.path().to_path_buf()));
        assert_eq!(source, ConfigSource::Xdg(xdg.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn empty_environment_value_is_ignored() {
        let dir = TempDir::new().unwrap();
        let source = resolve_source(None, Some(PathBuf::new()), dir.path(), None);
        assert_eq!(source, ConfigSource::Defaults);
    }
}
