//! CLI interface for repo-scorecard.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::config::{load_config, ScorecardConfig};
use crate::report::OutputFormat;

pub mod analyze;
pub mod inspect;
pub mod report;

/// repo-scorecard: scores development practices of student repositories.
#[derive(Parser)]
#[command(name = "repo-scorecard")]
#[command(about = "Scores development practices of student repositories", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Logs progress at info level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Analyses repositories and stores their records.
    Analyze(analyze::AnalyzeCommand),
    /// Analyses a single repository without storing anything.
    Inspect(inspect::InspectCommand),
    /// Ranks the stored records.
    Report(report::ReportCommand),
}

impl Cli {
    /// Executes the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Analyze(cmd) => cmd.execute().await,
            Commands::Inspect(cmd) => cmd.execute(),
            Commands::Report(cmd) => cmd.execute(),
        }
    }
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Explicit configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format: text (default), json, yaml.
    #[arg(long, default_value = "text")]
    pub format: String,
}

impl CommonArgs {
    /// Loads the effective configuration for the working directory.
    pub fn load_config(&self) -> Result<ScorecardConfig> {
        let cwd = std::env::current_dir().context("Failed to read the working directory")?;
        let (config, source) = load_config(self.config.as_deref(), &cwd)?;
        debug!(source = %source, "using configuration");
        Ok(config)
    }

    /// Parses the requested output format.
    pub fn output_format(&self) -> Result<OutputFormat> {
        self.format.parse().map_err(anyhow::Error::msg)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_analyze_with_overrides() {
        let cli = Cli::try_parse_from([
            "repo-scorecard",
            "analyze",
            "--repos-root",
            "/srv/repos",
            "--concurrency",
            "8",
            "--dry-run",
            "--format",
            "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Analyze(cmd) => {
                assert_eq!(cmd.repos_root, Some(PathBuf::from("/srv/repos")));
                assert_eq!(cmd.concurrency, Some(8));
                assert!(cmd.dry_run);
                assert_eq!(cmd.common.output_format().unwrap(), OutputFormat::Json);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["repo-scorecard", "report", "-v"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn inspect_requires_a_path() {
        assert!(Cli::try_parse_from(["repo-scorecard", "inspect"]).is_err());
    }

    #[test]
    fn unknown_format_is_an_error() {
        let args = CommonArgs {
            config: None,
            format: "csv".to_string(),
        };
        assert!(args.output_format().is_err());
    }
}
