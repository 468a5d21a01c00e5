//! Branch naming classification.

use serde::{Deserialize, Serialize};

/// Branch name fragments that mark a feature branch.
pub const FEATURE_BRANCH_PATTERNS: &[&str] = &[
    "feature/",
    "feat/",
    "feature-",
    "feat-",
    "dev/",
    "develop/",
    "development/",
];

/// Branch name fragments that mark a hotfix branch.
pub const HOTFIX_BRANCH_PATTERNS: &[&str] = &["hotfix/", "hotfix-", "fix/", "bugfix/", "patch/"];

/// Names accepted as the main integration branch, in priority order.
pub const MAIN_BRANCH_ALIASES: &[&str] = &["main", "master", "develop"];

/// Main branch assumed when no alias is present.
pub const DEFAULT_MAIN_BRANCH: &str = "main";

/// Branch naming tables used by [`BranchSet::classify`].
///
/// Patterns are lowercase fragments matched anywhere in the lowercased branch name.
#[derive(Debug, Clone, Copy)]
pub struct BranchPatterns {
    /// Feature branch fragments.
    pub feature: &'static [&'static str],
    /// Hotfix branch fragments.
    pub hotfix: &'static [&'static str],
    /// Main branch aliases.
    pub main_aliases: &'static [&'static str],
    /// Fallback main branch name.
    pub default_main: &'static str,
}

impl Default for BranchPatterns {
    fn default() -> Self {
        Self {
            feature: FEATURE_BRANCH_PATTERNS,
            hotfix: HOTFIX_BRANCH_PATTERNS,
            main_aliases: MAIN_BRANCH_ALIASES,
            default_main: DEFAULT_MAIN_BRANCH,
        }
    }
}

impl BranchPatterns {
    /// Returns true if the branch name contains a feature fragment.
    pub fn is_feature(&self, branch: &str) -> bool {
        matches_any(branch, self.feature)
    }

    /// Returns true if the branch name contains a hotfix fragment.
    pub fn is_hotfix(&self, branch: &str) -> bool {
        matches_any(branch, self.hotfix)
    }

    /// Picks the first branch equal to a main alias, else the default.
    pub fn main_branch(&self, branches: &[String]) -> String {
        branches
            .iter()
            .find(|b| self.main_aliases.contains(&b.as_str()))
            .cloned()
            .unwrap_or_else(|| self.default_main.to_string())
    }
}

fn matches_any(branch: &str, fragments: &[&str]) -> bool {
    let lower = branch.to_lowercase();
    fragments.iter().any(|f| lower.contains(f))
}

/// Local branches of a repository with their classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSet {
    /// All local branch names, in listing order.
    pub branches: Vec<String>,
    /// Branch designated as the main integration branch.
    pub main_branch: String,
    /// Branches classified as feature branches.
    pub feature_branches: Vec<String>,
    /// Branches classified as hotfix branches.
    pub hotfix_branches: Vec<String>,
}

impl BranchSet {
    /// Classifies a list of local branch names.
    ///
    /// Feature and hotfix are independent categories: a branch such as
    /// `feature/fix/login` lands in both, but at most once in each.
    pub fn classify(branches: Vec<String>, patterns: &BranchPatterns) -> Self {
        let main_branch = patterns.main_branch(&branches);
        let feature_branches = branches
            .iter()
            .filter(|b| patterns.is_feature(b))
            .cloned()
            .collect();
        let hotfix_branches = branches
            .iter()
            .filter(|b| patterns.is_hotfix(b))
            .cloned()
            .collect();

        Self {
            branches,
            main_branch,
            feature_branches,
            hotfix_branches,
        }
    }

    /// Returns an empty branch set with the default main branch.
    pub fn empty(patterns: &BranchPatterns) -> Self {
        Self::classify(Vec::new(), patterns)
    }

    /// Total number of local branches.
    pub fn total(&self) -> usize {
        self.branches.len()
    }
}
