//! Inspect command: analyses one repository and prints its record.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use super::CommonArgs;
use crate::git::RepositoryIdentity;
use crate::pipeline::{Analyzer, RepositoryAnalysis, RepositoryTarget};
use crate::report::render_record;
use crate::store::JsonIssueStore;

/// Inspect command options.
#[derive(Parser)]
pub struct InspectCommand {
    /// Repository to inspect.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Identity to use instead of the one derived from the remote or path.
    #[arg(long, value_name = "OWNER/NAME")]
    pub identity: Option<String>,

    /// Issue-tracker export.
    #[arg(long, value_name = "FILE")]
    pub issue_store: Option<PathBuf>,

    /// Collects per-commit line statistics.
    #[arg(long)]
    pub line_stats: bool,

    /// Shared options.
    #[command(flatten)]
    pub common: CommonArgs,
}

impl InspectCommand {
    /// Executes the inspect command.
    pub fn execute(self) -> Result<()> {
        let format = self.common.output_format()?;
        let mut config = self.common.load_config()?;
        if let Some(path) = self.issue_store {
            config.issue_store = path;
        }
        config.line_stats |= self.line_stats;

        let mut target = RepositoryTarget::single(self.path);
        if let Some(slug) = self.identity.as_deref() {
            let Some(identity) = RepositoryIdentity::parse(slug) else {
                bail!("Invalid identity '{slug}', expected OWNER/NAME");
            };
            target = target.with_identity(identity);
        }

        let store = JsonIssueStore::open(&config.issue_store).with_context(|| {
            format!("Failed to load issue store: {}", config.issue_store.display())
        })?;
        let analyzer = Analyzer::from_config(&config).context("Failed to build detection patterns")?;

        let record = analyzer.analyze(&target, &store);
        print!("{}", render_record(&record, format)?);
        Ok(())
    }
}
