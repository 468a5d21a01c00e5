//! Repository identity derived from remotes and clone paths

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

/// Owner used when nothing better is known.
pub const UNKNOWN_OWNER: &str = "local";

/// Stable identity of a repository, `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    /// Account or organisation owning the repository.
    pub owner: String,
    /// Repository name without a `.git` suffix.
    pub name: String,
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl RepositoryIdentity {
    /// Creates an identity from its parts.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parses `owner/name`.
    pub fn parse(slug: &str) -> Option<Self> {
        let (owner, name) = slug.trim_matches('/').split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(owner, name))
    }

    /// Extracts the identity from a remote URL.
    ///
    /// Handles `https://host/owner/repo(.git)`, `ssh://git@host/owner/repo.git`
    /// and scp-like `git@host:owner/repo.git`. The last two path segments are
    /// used, so nested group paths resolve to their innermost owner.
    pub fn from_remote_url(uri: &str) -> Option<Self> {
        let uri = uri.trim();
        let path = match Url::parse(uri) {
            Ok(url) if url.has_host() => url.path().to_string(),
            _ => {
                // scp-like syntax: user@host:path
                let (_, path) = uri.split_once(':')?;
                if path.starts_with("//") {
                    return None;
                }
                path.to_string()
            }
        };

        let mut segments = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .rev();
        let name = segments.next()?;
        let owner = segments.next()?;
        let name = name.strip_suffix(".git").unwrap_or(name);
        if name.is_empty() {
            return None;
        }

        Some(Self::new(owner, name))
    }

    /// Derives an identity from a clone's location, `<root>/<owner>/<name>`.
    ///
    /// Falls back to [`UNKNOWN_OWNER`] and the directory name when the path
    /// is not two levels below `root`.
    pub fn from_clone_path(root: Option<&Path>, path: &Path) -> Self {
        let relative = root.and_then(|r| path.strip_prefix(r).ok());
        if let Some(relative) = relative {
            let parts: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            if parts.len() >= 2 {
                return Self::new(&parts[parts.len() - 2], &parts[parts.len() - 1]);
            }
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(UNKNOWN_OWNER, name)
    }
}
