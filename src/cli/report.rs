//! Report command: ranks stored records.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use super::CommonArgs;
use crate::report::{rank, render_ranking};
use crate::store::{JsonRecordSink, RecordSink};

/// Report command options.
#[derive(Parser)]
pub struct ReportCommand {
    /// File the records were written to.
    #[arg(long, value_name = "FILE")]
    pub record_store: Option<PathBuf>,

    /// Shows only the first N repositories.
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Shared options.
    #[command(flatten)]
    pub common: CommonArgs,
}

impl ReportCommand {
    /// Executes the report command.
    pub fn execute(self) -> Result<()> {
        let format = self.common.output_format()?;
        let config = self.common.load_config()?;
        let path = self.record_store.unwrap_or(config.record_store);

        let sink = JsonRecordSink::open(&path)
            .with_context(|| format!("Failed to open record store: {}", path.display()))?;
        let records = sink
            .load_all()
            .context("Failed to read stored records")?
            .into_iter()
            .map(|stored| stored.record)
            .collect();

        let mut ranking = rank(records);
        if let Some(limit) = self.limit {
            ranking.truncate(limit);
        }
        print!("{}", render_ranking(&ranking, format)?);
        Ok(())
    }
}
