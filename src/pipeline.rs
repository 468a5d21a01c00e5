//! Repository discovery, per-repository analysis and batch execution.

pub mod analyzer;
pub mod discovery;
pub mod runner;

pub use analyzer::{Analyzer, RepositoryAnalysis, ISSUE_STORE_STAGE};
pub use discovery::{discover_repositories, RepositoryTarget, MAX_DISCOVERY_DEPTH};
pub use runner::{BatchRunner, BatchSummary, RepositoryOutcome, DEFAULT_RETRY_BACKOFF};
