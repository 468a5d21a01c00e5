//! # repo-scorecard
//!
//! Inspects local clones of student repositories and scores their
//! development practices: branching workflow, issue-driven development,
//! testing, and overall structure.
//!
//! ## Pipeline
//!
//! - [`git`] reads branches and commits and degrades per query on failure
//! - [`profile`] walks the working tree and classifies files
//! - [`workflow`], [`issues`] and [`testing`] turn those facts into scores
//! - [`quality`] assembles the [`RepositoryRecord`](quality::RepositoryRecord)
//! - [`pipeline`] runs many repositories concurrently and persists records
//!
//! ## Quick Start
//!
//! ```no_run
//! use repo_scorecard::config::ScorecardConfig;
//! use repo_scorecard::pipeline::{Analyzer, RepositoryAnalysis, RepositoryTarget};
//! use repo_scorecard::store::MemoryIssueStore;
//!
//! let analyzer = Analyzer::from_config(&ScorecardConfig::default()).unwrap();
//! let record = analyzer.analyze(
//!     &RepositoryTarget::single("repos/alice/shop"),
//!     &MemoryIssueStore::new(),
//! );
//! println!("{}: {}/100", record.identity, record.quality.score);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod git;
pub mod issues;
pub mod pipeline;
pub mod profile;
pub mod quality;
pub mod report;
pub mod store;
pub mod testing;
pub mod workflow;

pub use crate::cli::Cli;

/// The current version of repo-scorecard.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
