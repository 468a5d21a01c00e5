//! Git repository operations

use std::path::{Path, PathBuf};

use git2::{BranchType, ErrorCode, Repository, Revwalk, Sort};

use crate::git::{CommitRecord, InspectError, QueryKind};

/// Read-only queries the inspector needs from a version-control backend.
///
/// Implementations must never mutate repository state.
pub trait VcsQueries {
    /// Lists local branch names.
    fn list_branches(&self) -> Result<Vec<String>, InspectError>;

    /// Returns commits reachable from local branches, most recent first.
    fn log_commits(&self, cap: Option<usize>) -> Result<Vec<CommitRecord>, InspectError>;

    /// Counts reachable commits with more than one parent.
    fn count_merge_commits(&self) -> Result<usize, InspectError>;

    /// Counts reachable commits whose message contains `needle`, ignoring case.
    fn count_commits_matching(&self, needle: &str) -> Result<usize, InspectError>;

    /// Returns the checked-out branch, or `None` for detached or unborn heads.
    fn current_branch(&self) -> Result<Option<String>, InspectError>;
}

/// Git repository wrapper
pub struct GitRepository {
    repo: Repository,
    workdir: PathBuf,
    line_stats: bool,
}

impl GitRepository {
    /// Opens the repository at `path`.
    ///
    /// Fails with [`InspectError::Inaccessible`] when the path is missing or
    /// has no git metadata.
    pub fn open(path: &Path) -> Result<Self, InspectError> {
        if !path.exists() {
            return Err(InspectError::Inaccessible {
                path: path.to_path_buf(),
                reason: "path does not exist".to_string(),
            });
        }

        let repo = Repository::open(path).map_err(|e| InspectError::Inaccessible {
            path: path.to_path_buf(),
            reason: e.message().to_string(),
        })?;

        Ok(Self {
            repo,
            workdir: path.to_path_buf(),
            line_stats: false,
        })
    }

    /// Enables per-commit added/deleted line counts.
    #[must_use]
    pub fn with_line_stats(mut self, enabled: bool) -> Self {
        self.line_stats = enabled;
        self
    }

    /// Returns the path the repository was opened at.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Returns access to the underlying `git2::Repository`.
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Returns the URL of `origin`, or of the first remote that has one.
    pub fn remote_url(&self) -> Option<String> {
        if let Ok(remote) = self.repo.find_remote("origin") {
            if let Some(url) = remote.url() {
                return Some(url.to_string());
            }
        }

        let names = self.repo.remotes().ok()?;
        names
            .iter()
            .flatten()
            .filter_map(|name| self.repo.find_remote(name).ok())
            .find_map(|remote| remote.url().map(str::to_string))
    }

    /// Creates a time-sorted walk over every local branch head.
    fn walk_local_heads(&self, query: QueryKind) -> Result<Revwalk<'_>, InspectError> {
        let mut walker = self
            .repo
            .revwalk()
            .map_err(|e| InspectError::query(query, e))?;
        walker
            .set_sorting(Sort::TIME)
            .map_err(|e| InspectError::query(query, e))?;
        walker
            .push_glob("refs/heads/*")
            .map_err(|e| InspectError::query(query, e))?;
        Ok(walker)
    }

    /// Visits every reachable commit, stopping early when `visit` returns false.
    fn for_each_commit<F>(&self, query: QueryKind, mut visit: F) -> Result<(), InspectError>
    where
        F: FnMut(&git2::Commit<'_>) -> Result<bool, InspectError>,
    {
        for oid in self.walk_local_heads(query)? {
            let oid = oid.map_err(|e| InspectError::query(query, e))?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|e| InspectError::query(query, e))?;
            if !visit(&commit)? {
                break;
            }
        }
        Ok(())
    }
}

impl VcsQueries for GitRepository {
    fn list_branches(&self) -> Result<Vec<String>, InspectError> {
        let query = QueryKind::ListBranches;
        let mut names = Vec::new();

        let branches = self
            .repo
            .branches(Some(BranchType::Local))
            .map_err(|e| InspectError::query(query, e))?;
        for branch in branches {
            let (branch, _) = branch.map_err(|e| InspectError::query(query, e))?;
            if let Some(name) = branch.name().map_err(|e| InspectError::query(query, e))? {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    fn log_commits(&self, cap: Option<usize>) -> Result<Vec<CommitRecord>, InspectError> {
        let limit = cap.unwrap_or(usize::MAX);
        let mut commits = Vec::new();
        if limit == 0 {
            return Ok(commits);
        }

        self.for_each_commit(QueryKind::LogCommits, |commit| {
            commits.push(CommitRecord::from_git_commit(
                &self.repo,
                commit,
                self.line_stats,
            )?);
            Ok(commits.len() < limit)
        })?;

        Ok(commits)
    }

    fn count_merge_commits(&self) -> Result<usize, InspectError> {
        let mut merges = 0;
        self.for_each_commit(QueryKind::CountMergeCommits, |commit| {
            if commit.parent_count() > 1 {
                merges += 1;
            }
            Ok(true)
        })?;
        Ok(merges)
    }

    fn count_commits_matching(&self, needle: &str) -> Result<usize, InspectError> {
        let needle = needle.to_lowercase();
        let mut matching = 0;
        self.for_each_commit(QueryKind::CountMatching, |commit| {
            let message = String::from_utf8_lossy(commit.message_bytes()).to_lowercase();
            if message.contains(&needle) {
                matching += 1;
            }
            Ok(true)
        })?;
        Ok(matching)
    }

    fn current_branch(&self) -> Result<Option<String>, InspectError> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Ok(None)
            }
            Err(e) => return Err(InspectError::query(QueryKind::CurrentBranch, e)),
        };

        if !head.is_branch() {
            return Ok(None);
        }

        Ok(head.shorthand().map(str::to_string))
    }
}
