//! Repository inspection with per-query degradation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::git::{BranchPatterns, BranchSet, CommitRecord, InspectError, QueryKind, VcsQueries};

/// Substring used as the (coarse) rebase indicator in commit messages.
pub const REBASE_INDICATOR: &str = "rebase";

/// A query that failed and was replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFailure {
    /// Query that failed.
    pub query: QueryKind,
    /// Error message.
    pub message: String,
}

impl QueryFailure {
    fn from_error(error: &InspectError) -> Self {
        Self {
            query: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Facts extracted from one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    /// Classified local branches.
    pub branches: BranchSet,
    /// Commits, most recent first.
    pub commits: Vec<CommitRecord>,
    /// Commits with more than one parent.
    pub merge_commit_count: usize,
    /// Commits mentioning a rebase.
    pub rebase_indicator_count: usize,
    /// Checked-out branch, if any.
    pub current_branch: Option<String>,
    /// Queries that failed and were defaulted.
    pub failures: Vec<QueryFailure>,
}

impl Inspection {
    /// Returns the all-default inspection for a repository that could not be opened.
    pub fn unanalyzable(error: &InspectError, patterns: &BranchPatterns) -> Self {
        Self {
            branches: BranchSet::empty(patterns),
            commits: Vec::new(),
            merge_commit_count: 0,
            rebase_indicator_count: 0,
            current_branch: None,
            failures: vec![QueryFailure::from_error(error)],
        }
    }

    /// Returns true if the commit log was read, even if it was empty.
    pub fn commit_log_available(&self) -> bool {
        !self
            .failures
            .iter()
            .any(|f| matches!(f.query, QueryKind::Open | QueryKind::LogCommits))
    }

    /// Summarises commit activity.
    pub fn activity(&self) -> ActivitySummary {
        ActivitySummary::from_commits(&self.commits, self.current_branch.clone())
    }
}

/// Commit activity of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    /// Number of commits examined.
    pub total_commits: usize,
    /// Distinct authors of non-merge commits.
    pub contributors: usize,
    /// Checked-out branch, if any.
    pub current_branch: Option<String>,
    /// `hash author (date): subject` of the most recent commit.
    pub last_commit: Option<String>,
}

impl ActivitySummary {
    /// Builds the summary from commits ordered most recent first.
    pub fn from_commits(commits: &[CommitRecord], current_branch: Option<String>) -> Self {
        let contributors: BTreeSet<&str> = commits
            .iter()
            .filter(|c| !c.is_merge())
            .map(|c| c.author.as_str())
            .collect();

        let last_commit = commits.first().map(|c| {
            format!(
                "{} {} ({}): {}",
                c.short_hash(),
                c.author,
                c.date.format("%Y-%m-%d"),
                c.subject()
            )
        });

        Self {
            total_commits: commits.len(),
            contributors: contributors.len(),
            current_branch,
            last_commit,
        }
    }
}

/// Runs the read-only queries against a repository.
#[derive(Debug, Clone, Default)]
pub struct RepositoryInspector {
    patterns: BranchPatterns,
    commit_cap: Option<usize>,
}

impl RepositoryInspector {
    /// Creates an inspector with the given branch tables and optional commit cap.
    pub fn new(patterns: BranchPatterns, commit_cap: Option<usize>) -> Self {
        Self {
            patterns,
            commit_cap,
        }
    }

    /// Returns the branch tables in use.
    pub fn patterns(&self) -> &BranchPatterns {
        &self.patterns
    }

    /// Inspects a repository.
    ///
    /// Each query runs independently; a failure replaces that query's result
    /// with its default and is recorded in [`Inspection::failures`].
    pub fn inspect<Q: VcsQueries + ?Sized>(&self, vcs: &Q) -> Inspection {
        let mut failures = Vec::new();

        let names = degrade(vcs.list_branches(), &mut failures);
        let branches = BranchSet::classify(names, &self.patterns);
        let commits = degrade(vcs.log_commits(self.commit_cap), &mut failures);
        let merge_commit_count = degrade(vcs.count_merge_commits(), &mut failures);
        let rebase_indicator_count =
            degrade(vcs.count_commits_matching(REBASE_INDICATOR), &mut failures);
        let current_branch = degrade(vcs.current_branch(), &mut failures);

        Inspection {
            branches,
            commits,
            merge_commit_count,
            rebase_indicator_count,
            current_branch,
            failures,
        }
    }
}

fn degrade<T: Default>(result: Result<T, InspectError>, failures: &mut Vec<QueryFailure>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(query = %e.kind(), error = %e, "git query failed, using default");
            failures.push(QueryFailure::from_error(&e));
            T::default()
        }
    }
}
