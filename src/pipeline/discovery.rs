//! Repository discovery below a clone root.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::git::RepositoryIdentity;

/// Deepest directory level below the root that may hold a clone.
pub const MAX_DISCOVERY_DEPTH: usize = 3;

/// A repository scheduled for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    /// Clone location.
    pub path: PathBuf,
    /// Root the clone was discovered under.
    pub root: Option<PathBuf>,
    /// Identity forced by the caller.
    pub identity: Option<RepositoryIdentity>,
}

impl RepositoryTarget {
    /// A single repository given directly.
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            root: None,
            identity: None,
        }
    }

    /// A repository found below `root`.
    pub fn discovered(root: &Path, path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            root: Some(root.to_path_buf()),
            identity: None,
        }
    }

    /// Forces the identity instead of deriving it.
    #[must_use]
    pub fn with_identity(mut self, identity: RepositoryIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Resolves the identity: forced, then remote URL, then clone path.
    pub fn resolve_identity(&self, remote_url: Option<&str>) -> RepositoryIdentity {
        if let Some(identity) = &self.identity {
            return identity.clone();
        }
        remote_url
            .and_then(RepositoryIdentity::from_remote_url)
            .unwrap_or_else(|| RepositoryIdentity::from_clone_path(self.root.as_deref(), &self.path))
    }
}

/// Finds git clones below `root`, sorted by path.
///
/// A directory holding `.git` is a clone; the walk does not descend into it.
pub fn discover_repositories(root: &Path) -> Result<Vec<RepositoryTarget>> {
    if !root.is_dir() {
        bail!("Repositories root is not a directory: {}", root.display());
    }

    let mut targets = Vec::new();
    let mut walker = WalkDir::new(root)
        .max_depth(MAX_DISCOVERY_DEPTH)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory during discovery");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.file_name() == ".git" {
            walker.skip_current_dir();
            continue;
        }
        if entry.path().join(".git").exists() {
            debug!(path = %entry.path().display(), "discovered repository");
            targets.push(RepositoryTarget::discovered(root, entry.path()));
            walker.skip_current_dir();
        }
    }

    Ok(targets)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn clone_at(root: &Path, relative: &str) {
        fs::create_dir_all(root.join(relative).join(".git")).unwrap();
    }

    #[test]
    fn finds_owner_name_layout() {
        let dir = TempDir::new().unwrap();
        clone_at(dir.path(), "bob/game");
        clone_at(dir.path(), "alice/shop");
        clone_at(dir.path(), "alice/shop/vendor/lib");
        fs::create_dir_all(dir.path().join("carol/empty")).unwrap();

        let targets = discover_repositories(dir.path()).unwrap();
        let paths: Vec<_> = targets
            .iter()
            .map(|t| t.path.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(paths, vec![PathBuf::from("alice/shop"), PathBuf::from("bob/game")]);
    }

    #[test]
    fn ignores_clones_below_max_depth() {
        let dir = TempDir::new().unwrap();
        clone_at(dir.path(), "a/b/c/d");
        assert!(discover_repositories(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn root_itself_can_be_a_clone() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        let targets = discover_repositories(dir.path()).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].path, dir.path());
    }

    #[test]
    fn missing_root_is_an_error() {
        assert!(discover_repositories(Path::new("/no/such/root")).is_err());
    }

    #[test]
    fn identity_resolution_order() {
        let root = PathBuf::from("/repos");
        let target = RepositoryTarget::discovered(&root, &root.join("alice").join("shop"));

        assert_eq!(
            target.resolve_identity(Some("git@github.com:team/store.git")),
            RepositoryIdentity::new("team", "store")
        );
        assert_eq!(
            target.resolve_identity(None),
            RepositoryIdentity::new("alice", "shop")
        );

        let forced = target.with_identity(RepositoryIdentity::new("x", "y"));
        assert_eq!(
            forced.resolve_identity(Some("https://github.com/a/b")),
            RepositoryIdentity::new("x", "y")
        );
    }
}
