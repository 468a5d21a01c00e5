//! Git inspection and repository identity.

pub mod branch;
pub mod commit;
pub mod error;
pub mod inspector;
pub mod references;
pub mod remote;
pub mod repository;

pub use branch::{BranchPatterns, BranchSet};
pub use commit::CommitRecord;
pub use error::{InspectError, QueryKind};
pub use inspector::{ActivitySummary, Inspection, QueryFailure, RepositoryInspector};
pub use references::{ReferenceExtractor, ReferencePattern};
pub use remote::RepositoryIdentity;
pub use repository::{GitRepository, VcsQueries};

/// Number of hex characters to show in abbreviated commit hashes.
pub const SHORT_HASH_LEN: usize = 8;
