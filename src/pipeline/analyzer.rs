//! Per-repository analysis.

use tracing::{info, warn};

use crate::config::ScorecardConfig;
use crate::git::{
    BranchPatterns, GitRepository, Inspection, ReferenceExtractor, RepositoryInspector,
};
use crate::issues::IssueCorrelationAnalyzer;
use crate::pipeline::RepositoryTarget;
use crate::profile::FileTreeProfiler;
use crate::quality::{AnalysisWarning, QualityAggregator, RecordParts, RepositoryRecord};
use crate::store::IssueStore;
use crate::testing::{PatternError, TestSignalDetector};
use crate::workflow::{WorkflowClassifier, WorkflowSignals};

/// Warning stage used for issue store failures.
pub const ISSUE_STORE_STAGE: &str = "issue-store";

/// Produces the record of one repository.
///
/// Implementations never fail: problems degrade parts of the record and are
/// listed in [`RepositoryRecord::warnings`].
pub trait RepositoryAnalysis: Send + Sync {
    /// Analyses one repository.
    fn analyze(&self, target: &RepositoryTarget, store: &dyn IssueStore) -> RepositoryRecord;
}

/// The full analysis chain over a local clone.
#[derive(Debug, Clone)]
pub struct Analyzer {
    inspector: RepositoryInspector,
    profiler: FileTreeProfiler,
    workflow: WorkflowClassifier,
    issues: IssueCorrelationAnalyzer,
    testing: TestSignalDetector,
    quality: QualityAggregator,
    line_stats: bool,
}

impl Analyzer {
    /// Creates an analyzer with the default tables and the given settings.
    pub fn from_config(config: &ScorecardConfig) -> Result<Self, PatternError> {
        Ok(Self {
            inspector: RepositoryInspector::new(BranchPatterns::default(), config.commit_cap),
            profiler: FileTreeProfiler::default(),
            workflow: WorkflowClassifier,
            issues: IssueCorrelationAnalyzer::new(ReferenceExtractor::default()),
            testing: TestSignalDetector::with_defaults()?.with_tdd_window(config.tdd_window),
            quality: QualityAggregator,
            line_stats: config.line_stats,
        })
    }

    fn inspect(&self, target: &RepositoryTarget) -> (Inspection, Option<String>) {
        match GitRepository::open(&target.path) {
            Ok(repo) => {
                let repo = repo.with_line_stats(self.line_stats);
                (self.inspector.inspect(&repo), repo.remote_url())
            }
            Err(e) => {
                warn!(path = %target.path.display(), error = %e, "repository is not analyzable");
                (Inspection::unanalyzable(&e, self.inspector.patterns()), None)
            }
        }
    }
}

impl RepositoryAnalysis for Analyzer {
    fn analyze(&self, target: &RepositoryTarget, store: &dyn IssueStore) -> RepositoryRecord {
        let (inspection, remote_url) = self.inspect(target);
        let identity = target.resolve_identity(remote_url.as_deref());
        let mut warnings: Vec<AnalysisWarning> =
            inspection.failures.iter().map(AnalysisWarning::from).collect();

        let scan = self.profiler.scan(&target.path);
        if scan.profile.unreadable_entries > 0 {
            warnings.push(AnalysisWarning::new(
                "file-tree",
                format!("{} unreadable entries skipped", scan.profile.unreadable_entries),
            ));
        }

        let pull_requests = store.pull_request_count(&identity).unwrap_or_else(|e| {
            warn!(repo = %identity, error = %e, "pull request count unavailable");
            warnings.push(AnalysisWarning::new(ISSUE_STORE_STAGE, e.to_string()));
            0
        });
        let uses_pull_requests =
            pull_requests > 0 || inspection.commits.iter().any(|c| c.is_pull_request_merge());

        let workflow = self.workflow.classify(&WorkflowSignals {
            branches: &inspection.branches,
            total_commits: inspection.commits.len(),
            merge_commits: inspection.merge_commit_count,
            rebase_commits: inspection.rebase_indicator_count,
            uses_pull_requests,
        });

        let live_commits = inspection
            .commit_log_available()
            .then_some(inspection.commits.as_slice());
        let issues = self
            .issues
            .correlate_stored(&identity, live_commits, store)
            .unwrap_or_else(|e| {
                warn!(repo = %identity, error = %e, "issue store unavailable");
                warnings.push(AnalysisWarning::new(ISSUE_STORE_STAGE, e.to_string()));
                self.issues.correlate(&inspection.commits, &[])
            });

        let testing = self
            .testing
            .detect(&target.path, &scan, &inspection.commits);

        let record = self.quality.assemble(
            &target.path,
            RecordParts {
                identity,
                remote_url,
                structure: scan.profile,
                activity: inspection.activity(),
                workflow,
                issues,
                testing,
                warnings,
            },
        );

        info!(
            repo = %record.identity,
            quality = record.quality.score,
            workflow = record.workflow.score,
            issues = record.issues.score,
            degraded = record.is_degraded(),
            "analyzed repository"
        );
        record
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::git::{CommitRecord, RepositoryIdentity};
    use crate::issues::IssueRecord;
    use crate::store::{MemoryIssueStore, StoreError};
    use std::fs;
    use tempfile::TempDir;

    struct UnavailableStore;

    impl IssueStore for UnavailableStore {
        fn issues_for(&self, _: &RepositoryIdentity) -> Result<Vec<IssueRecord>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn commits_for(&self, _: &RepositoryIdentity) -> Result<Vec<CommitRecord>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn pull_request_count(&self, _: &RepositoryIdentity) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn plain_directory() -> (TempDir, RepositoryTarget) {
        let root = TempDir::new().unwrap();
        let clone = root.path().join("dana").join("site");
        fs::create_dir_all(&clone).unwrap();
        fs::write(clone.join("README.md"), "# Site\n").unwrap();
        fs::write(clone.join("index.js"), "console.log(1);\n").unwrap();
        let target = RepositoryTarget::discovered(root.path(), &clone);
        (root, target)
    }

    #[test]
    fn non_repository_degrades_to_tree_facts() {
        let (_root, target) = plain_directory();
        let analyzer = Analyzer::from_config(&ScorecardConfig::default()).unwrap();

        let record = analyzer.analyze(&target, &MemoryIssueStore::new());

        assert_eq!(record.identity, RepositoryIdentity::new("dana", "site"));
        assert!(record.is_degraded());
        assert_eq!(record.warnings[0].stage, "open");
        assert_eq!(record.activity.total_commits, 0);
        assert_eq!(record.structure.code_files, 1);
        assert_eq!(record.quality.score, 50);
        assert_eq!(record.issues.score, 10);
    }

    #[test]
    fn unavailable_store_is_a_warning() {
        let (_root, target) = plain_directory();
        let analyzer = Analyzer::from_config(&ScorecardConfig::default()).unwrap();

        let record = analyzer.analyze(&target, &UnavailableStore);

        let stages: Vec<_> = record.warnings.iter().map(|w| w.stage.as_str()).collect();
        assert!(stages.contains(&ISSUE_STORE_STAGE));
        assert_eq!(record.issues.total_issues, 0);
        assert!(!record.workflow.uses_pull_requests);
    }

    #[test]
    fn forced_identity_is_kept() {
        let (_root, target) = plain_directory();
        let target = target.with_identity(RepositoryIdentity::new("course", "final"));
        let analyzer = Analyzer::from_config(&ScorecardConfig::default()).unwrap();

        let record = analyzer.analyze(&target, &MemoryIssueStore::new());
        assert_eq!(record.identity.to_string(), "course/final");
    }
}
