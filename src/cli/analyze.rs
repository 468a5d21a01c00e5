//! Analyze command: batch analysis of many repositories.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use super::CommonArgs;
use crate::config::ScorecardConfig;
use crate::pipeline::{discover_repositories, Analyzer, BatchRunner, RepositoryTarget};
use crate::report::render_summary;
use crate::store::{JsonIssueStore, JsonRecordSink, MemoryRecordSink, RecordSink};

/// Analyze command options.
#[derive(Parser)]
pub struct AnalyzeCommand {
    /// Repositories to analyse (defaults to every clone below the repositories root).
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Directory holding clones as `owner/name`.
    #[arg(long, value_name = "DIR")]
    pub repos_root: Option<PathBuf>,

    /// Issue-tracker export.
    #[arg(long, value_name = "FILE")]
    pub issue_store: Option<PathBuf>,

    /// File the records are written to.
    #[arg(long, value_name = "FILE")]
    pub record_store: Option<PathBuf>,

    /// Repositories analysed at the same time.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-repository time limit in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Maximum commits read per repository.
    #[arg(long)]
    pub commit_cap: Option<usize>,

    /// Collects per-commit line statistics.
    #[arg(long)]
    pub line_stats: bool,

    /// Analyses without writing the record store.
    #[arg(long)]
    pub dry_run: bool,

    /// Exits with an error if any repository failed.
    #[arg(long)]
    pub strict: bool,

    /// Shared options.
    #[command(flatten)]
    pub common: CommonArgs,
}

impl AnalyzeCommand {
    /// Executes the analyze command.
    pub async fn execute(self) -> Result<()> {
        let format = self.common.output_format()?;
        let config = self.effective_config()?;

        let targets = if self.paths.is_empty() {
            discover_repositories(&config.repos_root).with_context(|| {
                format!("Failed to discover repositories in {}", config.repos_root.display())
            })?
        } else {
            self.paths.iter().cloned().map(RepositoryTarget::single).collect()
        };
        if targets.is_empty() {
            println!("No repositories found in {}", config.repos_root.display());
            return Ok(());
        }

        let store = JsonIssueStore::open(&config.issue_store).with_context(|| {
            format!("Failed to load issue store: {}", config.issue_store.display())
        })?;
        let sink: Arc<dyn RecordSink> = if self.dry_run {
            Arc::new(MemoryRecordSink::new())
        } else {
            Arc::new(JsonRecordSink::open(&config.record_store).with_context(|| {
                format!("Failed to open record store: {}", config.record_store.display())
            })?)
        };
        let analyzer = Analyzer::from_config(&config).context("Failed to build detection patterns")?;

        let summary = BatchRunner::new(Arc::new(analyzer), Arc::new(store), sink)
            .with_limits(&config)
            .run(targets)
            .await;

        print!("{}", render_summary(&summary, format)?);

        if self.strict && !summary.is_complete() {
            bail!(
                "{} of {} repositories failed",
                summary.failed,
                summary.total
            );
        }
        Ok(())
    }

    /// Applies command-line overrides on top of the configuration file.
    fn effective_config(&self) -> Result<ScorecardConfig> {
        let mut config = self.common.load_config()?;
        if let Some(root) = &self.repos_root {
            config.repos_root = root.clone();
        }
        if let Some(path) = &self.issue_store {
            config.issue_store = path.clone();
        }
        if let Some(path) = &self.record_store {
            config.record_store = path.clone();
        }
        if let Some(n) = self.concurrency {
            config.concurrency = n;
        }
        if let Some(secs) = self.timeout {
            config.timeout_secs = secs;
        }
        if self.commit_cap.is_some() {
            config.commit_cap = self.commit_cap;
        }
        if self.line_stats {
            config.line_stats = true;
        }
        config.validate()?;
        Ok(config)
    }
}
