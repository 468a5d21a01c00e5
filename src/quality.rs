//! Quality scoring and the composite repository record.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::git::{ActivitySummary, QueryFailure, RepositoryIdentity};
use crate::issues::IssueCorrelation;
use crate::profile::FileTreeProfile;
use crate::store::{RecordSink, StoreError, UpsertOutcome};
use crate::testing::TestProfile;
use crate::workflow::WorkflowProfile;

/// Points per satisfied quality check.
pub const CHECK_POINTS: u32 = 25;

/// Structural and activity quality of a repository.
///
/// Four independent checks worth [`CHECK_POINTS`] each, so the score is
/// always one of 0, 25, 50, 75 or 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Sum of the satisfied checks.
    pub score: u32,
    /// A README exists.
    pub has_readme: bool,
    /// At least one code file exists.
    pub has_code: bool,
    /// A dependency manifest exists.
    pub has_manifest: bool,
    /// At least one commit exists.
    pub has_commits: bool,
}

impl QualityScore {
    /// Returns the check names with their outcome, in scoring order.
    pub fn breakdown(&self) -> [(&'static str, bool); 4] {
        [
            ("readme", self.has_readme),
            ("code", self.has_code),
            ("manifest", self.has_manifest),
            ("commits", self.has_commits),
        ]
    }
}

/// A non-fatal problem met while analysing a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWarning {
    /// Stage that degraded, e.g. `log-commits` or `issue-store`.
    pub stage: String,
    /// What went wrong.
    pub message: String,
}

impl AnalysisWarning {
    /// Creates a warning.
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

impl From<&QueryFailure> for AnalysisWarning {
    fn from(failure: &QueryFailure) -> Self {
        Self::new(failure.query.to_string(), failure.message.clone())
    }
}

/// Everything computed for one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// `owner/name`.
    pub identity: RepositoryIdentity,
    /// Local clone path.
    pub path: String,
    /// Remote URL, when the clone has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    /// Working tree structure.
    pub structure: FileTreeProfile,
    /// Commit activity.
    pub activity: ActivitySummary,
    /// Branching workflow.
    pub workflow: WorkflowProfile,
    /// Issue-driven development.
    pub issues: IssueCorrelation,
    /// Testing practice.
    pub testing: TestProfile,
    /// Structural quality.
    pub quality: QualityScore,
    /// Degraded stages.
    #[serde(default)]
    pub warnings: Vec<AnalysisWarning>,
}

impl RepositoryRecord {
    /// Returns true when some stage fell back to defaults.
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Parts a [`RepositoryRecord`] is assembled from.
#[derive(Debug, Clone)]
pub struct RecordParts {
    /// Repository identity.
    pub identity: RepositoryIdentity,
    /// Remote URL.
    pub remote_url: Option<String>,
    /// Tree profile.
    pub structure: FileTreeProfile,
    /// Commit activity.
    pub activity: ActivitySummary,
    /// Workflow profile.
    pub workflow: WorkflowProfile,
    /// Issue correlation.
    pub issues: IssueCorrelation,
    /// Test profile.
    pub testing: TestProfile,
    /// Degraded stages.
    pub warnings: Vec<AnalysisWarning>,
}

/// Computes the quality score and assembles records.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityAggregator;

impl QualityAggregator {
    /// Scores structure and activity.
    pub fn score(&self, structure: &FileTreeProfile, total_commits: usize) -> QualityScore {
        let has_readme = structure.has_readme;
        let has_code = structure.code_files > 0;
        let has_manifest = structure.has_manifest;
        let has_commits = total_commits > 0;

        let score = [has_readme, has_code, has_manifest, has_commits]
            .into_iter()
            .filter(|passed| *passed)
            .count() as u32
            * CHECK_POINTS;

        QualityScore {
            score,
            has_readme,
            has_code,
            has_manifest,
            has_commits,
        }
    }

    /// Builds the composite record for a repository at `path`.
    pub fn assemble(&self, path: &Path, parts: RecordParts) -> RepositoryRecord {
        let quality = self.score(&parts.structure, parts.activity.total_commits);

        RepositoryRecord {
            identity: parts.identity,
            path: path.display().to_string(),
            remote_url: parts.remote_url,
            structure: parts.structure,
            activity: parts.activity,
            workflow: parts.workflow,
            issues: parts.issues,
            testing: parts.testing,
            quality,
            warnings: parts.warnings,
        }
    }

    /// Upserts the record through the sink.
    pub fn persist(
        &self,
        sink: &dyn RecordSink,
        record: &RepositoryRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        let outcome = sink.upsert(record)?;
        debug!(repo = %record.identity, ?outcome, "record persisted");
        Ok(outcome)
    }
}
