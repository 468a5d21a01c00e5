//! Commit records extracted from a repository.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use git2::{Commit, Repository};
use serde::{Deserialize, Serialize};

use crate::git::{InspectError, QueryKind};

/// Prefix GitHub writes into the subject of pull-request merge commits.
pub const PULL_REQUEST_MERGE_PREFIX: &str = "Merge pull request #";

/// A single commit as seen by the scoring pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full SHA-1 hash of the commit.
    pub hash: String,
    /// Author display name.
    pub author: String,
    /// Author date with its original timezone.
    pub date: DateTime<FixedOffset>,
    /// Full commit message.
    pub message: String,
    /// Number of parents; records persisted without it are treated as regular commits.
    #[serde(default = "default_parent_count")]
    pub parent_count: usize,
    /// Lines added relative to the first parent, when collected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_added: Option<usize>,
    /// Lines deleted relative to the first parent, when collected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_deleted: Option<usize>,
}

fn default_parent_count() -> usize {
    1
}

impl CommitRecord {
    /// Creates a `CommitRecord` from a `git2::Commit`.
    pub fn from_git_commit(
        repo: &Repository,
        commit: &Commit<'_>,
        line_stats: bool,
    ) -> Result<Self, InspectError> {
        let hash = commit.id().to_string();
        let signature = commit.author();
        let author = signature.name().unwrap_or("Unknown").to_string();

        let when = signature.when();
        let offset = FixedOffset::east_opt(when.offset_minutes() * 60).unwrap_or_else(|| Utc.fix());
        let date = DateTime::from_timestamp(when.seconds(), 0)
            .ok_or_else(|| InspectError::InvalidTimestamp {
                hash: hash.clone(),
                seconds: when.seconds(),
            })?
            .with_timezone(&offset);

        let message = String::from_utf8_lossy(commit.message_bytes()).into_owned();

        let (lines_added, lines_deleted) = if line_stats {
            let (added, deleted) = line_changes(repo, commit)
                .map_err(|e| InspectError::query(QueryKind::LogCommits, e))?;
            (Some(added), Some(deleted))
        } else {
            (None, None)
        };

        Ok(Self {
            hash,
            author,
            date,
            message,
            parent_count: commit.parent_count(),
            lines_added,
            lines_deleted,
        })
    }

    /// Returns the abbreviated hash.
    pub fn short_hash(&self) -> &str {
        self.hash.get(..crate::git::SHORT_HASH_LEN).unwrap_or(&self.hash)
    }

    /// Returns the first line of the message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }

    /// Returns true for commits with more than one parent.
    pub fn is_merge(&self) -> bool {
        self.parent_count > 1
    }

    /// Returns true when the subject is a pull-request merge written by the forge.
    pub fn is_pull_request_merge(&self) -> bool {
        self.subject().starts_with(PULL_REQUEST_MERGE_PREFIX)
    }
}

/// Counts inserted and deleted lines between a commit and its first parent.
fn line_changes(repo: &Repository, commit: &Commit<'_>) -> Result<(usize, usize), git2::Error> {
    let commit_tree = commit.tree()?;
    let parent_tree = if commit.parent_count() > 0 {
        Some(commit.parent(0)?.tree()?)
    } else {
        None
    };

    // Initial commits diff against the empty tree
    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), None)?;
    let stats = diff.stats()?;

    Ok((stats.insertions(), stats.deletions()))
}
