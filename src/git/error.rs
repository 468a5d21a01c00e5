//! Inspection error handling.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The read-only queries the inspector issues against a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryKind {
    /// Opening the repository itself.
    Open,
    /// Listing local branches.
    ListBranches,
    /// Walking the commit log.
    LogCommits,
    /// Counting commits with more than one parent.
    CountMergeCommits,
    /// Counting commits whose message contains a needle.
    CountMatching,
    /// Resolving the checked-out branch.
    CurrentBranch,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::ListBranches => "list-branches",
            Self::LogCommits => "log-commits",
            Self::CountMergeCommits => "count-merge-commits",
            Self::CountMatching => "count-matching",
            Self::CurrentBranch => "current-branch",
        };
        f.write_str(name)
    }
}

/// Errors raised while inspecting a repository.
#[derive(Error, Debug)]
pub enum InspectError {
    /// The path is missing or does not hold a git repository.
    #[error("repository at {path} is not accessible: {reason}")]
    Inaccessible {
        /// Path that was inspected.
        path: PathBuf,
        /// Why the repository could not be opened.
        reason: String,
    },

    /// A git query failed.
    #[error("git query {query} failed: {source}")]
    Query {
        /// Query that failed.
        query: QueryKind,
        /// Underlying libgit2 error.
        #[source]
        source: git2::Error,
    },

    /// A commit carried a timestamp outside the representable range.
    #[error("commit {hash} has an invalid timestamp {seconds}")]
    InvalidTimestamp {
        /// Commit hash.
        hash: String,
        /// Raw seconds since the epoch.
        seconds: i64,
    },
}

impl InspectError {
    /// Wraps a libgit2 error raised by `query`.
    pub fn query(query: QueryKind, source: git2::Error) -> Self {
        Self::Query { query, source }
    }

    /// Returns the query kind this error belongs to.
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::Inaccessible { .. } => QueryKind::Open,
            Self::Query { query, .. } => *query,
            Self::InvalidTimestamp { .. } => QueryKind::LogCommits,
        }
    }
}
