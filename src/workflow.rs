//! Branching workflow classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::git::BranchSet;

/// Points awarded when feature branches exist.
pub const FEATURE_BRANCH_POINTS: u32 = 20;
/// Points awarded when merge commits exist.
pub const MERGE_POINTS: u32 = 15;
/// Points awarded when rebase indicators exist.
pub const REBASE_POINTS: u32 = 10;
/// Points awarded for pull-request usage.
pub const PULL_REQUEST_POINTS: u32 = 25;
/// Upper bound of the workflow score.
pub const MAX_WORKFLOW_SCORE: u32 = 100;

/// Coarse workflow style, derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkflowStyle {
    /// Fewer than 20 points.
    #[serde(rename = "simple")]
    Simple,
    /// 20 to 39 points.
    #[serde(rename = "trunk-based")]
    TrunkBased,
    /// 40 to 59 points.
    #[serde(rename = "feature-branch")]
    FeatureBranch,
    /// 60 points or more.
    #[serde(rename = "full workflow")]
    FullWorkflow,
}

impl WorkflowStyle {
    /// Maps a score onto a style using inclusive lower bounds.
    pub fn from_score(score: u32) -> Self {
        match score {
            60.. => Self::FullWorkflow,
            40..=59 => Self::FeatureBranch,
            20..=39 => Self::TrunkBased,
            _ => Self::Simple,
        }
    }
}

impl fmt::Display for WorkflowStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Simple => "simple",
            Self::TrunkBased => "trunk-based",
            Self::FeatureBranch => "feature-branch",
            Self::FullWorkflow => "full workflow",
        };
        f.write_str(label)
    }
}

/// Raw workflow signals of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSignals<'a> {
    /// Classified local branches.
    pub branches: &'a BranchSet,
    /// Commits examined.
    pub total_commits: usize,
    /// Commits with more than one parent.
    pub merge_commits: usize,
    /// Commits mentioning a rebase.
    pub rebase_commits: usize,
    /// Pull requests were used.
    pub uses_pull_requests: bool,
}

/// Branching discipline of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowProfile {
    /// Number of local branches.
    pub total_branches: usize,
    /// Designated main branch.
    pub main_branch: String,
    /// Feature branch count.
    pub feature_branches: usize,
    /// Hotfix branch count.
    pub hotfix_branches: usize,
    /// Commits examined.
    pub total_commits: usize,
    /// Merge commits.
    pub merge_commits: usize,
    /// Commits mentioning a rebase.
    pub rebase_commits: usize,
    /// Estimate of commits made directly on the main line.
    pub commits_on_main: usize,
    /// Estimate of commits that arrived through branches.
    pub commits_on_branches: usize,
    /// At least one feature branch exists.
    pub uses_feature_branches: bool,
    /// At least one merge commit exists.
    pub uses_merge_commits: bool,
    /// At least one rebase indicator exists.
    pub uses_rebase: bool,
    /// Pull requests were used.
    pub uses_pull_requests: bool,
    /// Human-readable names of the practices that scored.
    pub practices: Vec<String>,
    /// Score in `0..=100`.
    pub score: u32,
    /// Style derived from the score.
    pub style: WorkflowStyle,
}

/// Scores branching discipline from inspection facts.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowClassifier;

impl WorkflowClassifier {
    /// Classifies the workflow of one repository.
    pub fn classify(&self, signals: &WorkflowSignals<'_>) -> WorkflowProfile {
        let uses_feature_branches = !signals.branches.feature_branches.is_empty();
        let uses_merge_commits = signals.merge_commits > 0;
        let uses_rebase = signals.rebase_commits > 0;
        let uses_pull_requests = signals.uses_pull_requests;

        let mut score = 0;
        let mut practices = Vec::new();
        for (enabled, points, practice) in [
            (uses_feature_branches, FEATURE_BRANCH_POINTS, "feature branches"),
            (uses_merge_commits, MERGE_POINTS, "merge commits"),
            (uses_rebase, REBASE_POINTS, "rebase"),
            (uses_pull_requests, PULL_REQUEST_POINTS, "pull requests"),
        ] {
            if enabled {
                score += points;
                practices.push(practice.to_string());
            }
        }
        let score = score.min(MAX_WORKFLOW_SCORE);

        WorkflowProfile {
            total_branches: signals.branches.total(),
            main_branch: signals.branches.main_branch.clone(),
            feature_branches: signals.branches.feature_branches.len(),
            hotfix_branches: signals.branches.hotfix_branches.len(),
            total_commits: signals.total_commits,
            merge_commits: signals.merge_commits,
            rebase_commits: signals.rebase_commits,
            commits_on_main: signals.total_commits.saturating_sub(signals.merge_commits),
            commits_on_branches: signals.merge_commits,
            uses_feature_branches,
            uses_merge_commits,
            uses_rebase,
            uses_pull_requests,
            practices,
            score,
            style: WorkflowStyle::from_score(score),
        }
    }
}
