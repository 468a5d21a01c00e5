//! Issue stores and record sinks.

pub mod json;
pub mod memory;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::git::{CommitRecord, RepositoryIdentity};
use crate::issues::IssueRecord;
use crate::quality::RepositoryRecord;

pub use json::{JsonIssueStore, JsonRecordSink};
pub use memory::{MemoryIssueStore, MemoryRecordSink};

/// Store and sink errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing a store file failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A store file could not be parsed.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Records could not be serialized.
    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The backing store refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Everything the issue tracker knows about one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRepository {
    /// Issues of the repository.
    #[serde(default)]
    pub issues: Vec<IssueRecord>,
    /// Commits as last synchronised from the forge.
    #[serde(default)]
    pub commits: Vec<CommitRecord>,
    /// Number of pull requests opened against the repository.
    #[serde(default)]
    pub pull_requests: usize,
}

/// Read access to stored issue-tracker data.
///
/// A repository the store does not know about has no issues, no commits and
/// no pull requests.
pub trait IssueStore: Send + Sync {
    /// Returns the issues of a repository.
    fn issues_for(&self, repo: &RepositoryIdentity) -> Result<Vec<IssueRecord>, StoreError>;

    /// Returns the stored commits of a repository.
    fn commits_for(&self, repo: &RepositoryIdentity) -> Result<Vec<CommitRecord>, StoreError>;

    /// Returns the number of pull requests of a repository.
    fn pull_request_count(&self, repo: &RepositoryIdentity) -> Result<usize, StoreError>;
}

/// Whether an upsert inserted or replaced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    /// No record existed for the identity.
    Created,
    /// An existing record was replaced.
    Replaced,
}

/// A persisted record with its bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// When the identity was first written.
    pub created_at: DateTime<Utc>,
    /// When the record was last replaced.
    pub updated_at: DateTime<Utc>,
    /// The record itself.
    pub record: RepositoryRecord,
}

impl StoredRecord {
    /// Applies an upsert at `now` to an optional previous entry.
    pub(crate) fn upsert(
        previous: Option<&StoredRecord>,
        record: RepositoryRecord,
        now: DateTime<Utc>,
    ) -> (Self, UpsertOutcome) {
        match previous {
            Some(previous) => (
                Self {
                    created_at: previous.created_at,
                    updated_at: now,
                    record,
                },
                UpsertOutcome::Replaced,
            ),
            None => (
                Self {
                    created_at: now,
                    updated_at: now,
                    record,
                },
                UpsertOutcome::Created,
            ),
        }
    }
}

/// Write access to the analysis results, keyed by repository identity.
pub trait RecordSink: Send + Sync {
    /// Inserts or replaces the record for `record.identity`.
    fn upsert(&self, record: &RepositoryRecord) -> Result<UpsertOutcome, StoreError>;

    /// Returns every stored record ordered by identity.
    fn load_all(&self) -> Result<Vec<StoredRecord>, StoreError>;
}
