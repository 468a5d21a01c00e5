//! Issue-driven development analysis.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::git::{CommitRecord, ReferenceExtractor, RepositoryIdentity};
use crate::store::{IssueStore, StoreError};

/// Score at or above which a repository counts as issue driven.
pub const ADHERENCE_THRESHOLD: u32 = 60;

/// Points every repository receives regardless of its ratios.
pub const BASELINE_POINTS: u32 = 10;

/// `(minimum ratio, points)` bands, highest first.
type Bands = [(f64, u32); 4];

const COMMIT_REFERENCE_BANDS: Bands = [(80.0, 40), (60.0, 30), (40.0, 20), (20.0, 10)];
const ASSIGNEE_BANDS: Bands = [(80.0, 30), (60.0, 25), (40.0, 20), (20.0, 15)];
const CLOSURE_BANDS: Bands = [(80.0, 20), (60.0, 15), (40.0, 10), (20.0, 5)];

fn band_points(ratio: f64, bands: &Bands) -> u32 {
    bands
        .iter()
        .find(|(min, _)| ratio >= *min)
        .map_or(0, |(_, points)| *points)
}

/// `part * 100 / whole`, or 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Issue state on the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    /// Still open.
    Open,
    /// Closed, for whatever reason.
    Closed,
}

/// An issue as exported from the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Issue number.
    pub number: u64,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Current state.
    pub state: IssueState,
    /// Someone is assigned.
    #[serde(default)]
    pub has_assignee: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Closing time, if closed.
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

impl IssueRecord {
    /// Returns true for closed issues.
    pub fn is_closed(&self) -> bool {
        self.state == IssueState::Closed
    }
}

/// Quality label of the issue-driven score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueQuality {
    /// Below 20.
    #[serde(rename = "very poor")]
    VeryPoor,
    /// 20 to 39.
    Poor,
    /// 40 to 59.
    Fair,
    /// 60 to 79.
    Good,
    /// 80 or more.
    Excellent,
}

impl IssueQuality {
    /// Maps a score onto a label using inclusive lower bounds.
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => Self::Excellent,
            60..=79 => Self::Good,
            40..=59 => Self::Fair,
            20..=39 => Self::Poor,
            _ => Self::VeryPoor,
        }
    }
}

impl fmt::Display for IssueQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::VeryPoor => "very poor",
            Self::Poor => "poor",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Excellent => "excellent",
        };
        f.write_str(label)
    }
}

/// Where the analysed commits came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitSource {
    /// Read from the local clone.
    Live,
    /// Taken from the issue store because the clone's log was unreadable.
    Stored,
}

/// Commit to issue correlation of one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueCorrelation {
    /// Commits analysed.
    pub total_commits: usize,
    /// Commits whose subject references an issue.
    pub commits_with_issue_refs: usize,
    /// Commits without a reference.
    pub commits_without_issue_refs: usize,
    /// Distinct referenced issue numbers, ascending.
    pub referenced_issues: Vec<u64>,
    /// Issues on the tracker.
    pub total_issues: usize,
    /// Issues with an assignee.
    pub issues_with_assignee: usize,
    /// Issues without an assignee.
    pub issues_without_assignee: usize,
    /// Open issues.
    pub open_issues: usize,
    /// Closed issues.
    pub closed_issues: usize,
    /// Percentage of commits referencing an issue.
    pub commit_issue_ratio: f64,
    /// Percentage of issues with an assignee.
    pub issue_assignee_ratio: f64,
    /// Percentage of closed issues.
    pub issue_closure_ratio: f64,
    /// Score in `0..=100`.
    pub score: u32,
    /// Label derived from the score.
    pub quality: IssueQuality,
    /// Score reaches [`ADHERENCE_THRESHOLD`].
    pub adheres: bool,
    /// Practices that were observed.
    pub observations: Vec<String>,
    /// Origin of the analysed commits.
    pub commit_source: CommitSource,
}

/// Correlates commits with tracker issues.
#[derive(Debug, Clone, Default)]
pub struct IssueCorrelationAnalyzer {
    references: ReferenceExtractor,
}

impl IssueCorrelationAnalyzer {
    /// Creates an analyzer with the given reference patterns.
    pub fn new(references: ReferenceExtractor) -> Self {
        Self { references }
    }

    /// Returns the reference extractor in use.
    pub fn references(&self) -> &ReferenceExtractor {
        &self.references
    }

    /// Correlates the given commits and issues.
    pub fn correlate(&self, commits: &[CommitRecord], issues: &[IssueRecord]) -> IssueCorrelation {
        let mut referenced = BTreeSet::new();
        let mut with_refs = 0;
        for commit in commits {
            let subject = commit.subject();
            if self.references.has_reference(subject) {
                with_refs += 1;
                referenced.extend(self.references.extract(subject));
            }
        }

        let total_commits = commits.len();
        let total_issues = issues.len();
        let assigned = issues.iter().filter(|i| i.has_assignee).count();
        let closed = issues.iter().filter(|i| i.is_closed()).count();

        let commit_issue_ratio = percentage(with_refs, total_commits);
        let issue_assignee_ratio = percentage(assigned, total_issues);
        let issue_closure_ratio = percentage(closed, total_issues);

        let score = band_points(commit_issue_ratio, &COMMIT_REFERENCE_BANDS)
            + band_points(issue_assignee_ratio, &ASSIGNEE_BANDS)
            + band_points(issue_closure_ratio, &CLOSURE_BANDS)
            + BASELINE_POINTS;

        let mut observations = Vec::new();
        if with_refs > 0 {
            observations.push(format!(
                "commit messages reference issues ({with_refs} of {total_commits} commits)"
            ));
        }
        if total_issues > 0 {
            observations.push(format!("issues are tracked ({total_issues} issues)"));
        }
        if closed > 0 {
            observations.push(format!("issues get closed ({closed} closed)"));
        }
        if assigned > 0 {
            observations.push(format!("issues have assignees ({assigned} assigned)"));
        }

        IssueCorrelation {
            total_commits,
            commits_with_issue_refs: with_refs,
            commits_without_issue_refs: total_commits - with_refs,
            referenced_issues: referenced.into_iter().collect(),
            total_issues,
            issues_with_assignee: assigned,
            issues_without_assignee: total_issues - assigned,
            open_issues: total_issues - closed,
            closed_issues: closed,
            commit_issue_ratio,
            issue_assignee_ratio,
            issue_closure_ratio,
            score,
            quality: IssueQuality::from_score(score),
            adheres: score >= ADHERENCE_THRESHOLD,
            observations,
            commit_source: CommitSource::Live,
        }
    }

    /// Correlates a repository against the issue store.
    ///
    /// `live_commits` is `None` when the clone's log could not be read; the
    /// store's commits are used instead.
    pub fn correlate_stored(
        &self,
        repo: &RepositoryIdentity,
        live_commits: Option<&[CommitRecord]>,
        store: &dyn IssueStore,
    ) -> Result<IssueCorrelation, StoreError> {
        let issues = store.issues_for(repo)?;
        match live_commits {
            Some(commits) => Ok(self.correlate(commits, &issues)),
            None => {
                let stored = store.commits_for(repo)?;
                let mut correlation = self.correlate(&stored, &issues);
                correlation.commit_source = CommitSource::Stored;
                Ok(correlation)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::git::inspector::tests::commit;
    use crate::store::{MemoryIssueStore, StoredRepository};

    fn issue(number: u64, assigned: bool, closed: bool) -> IssueRecord {
        let created_at = DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        IssueRecord {
            number,
            title: format!("issue {number}"),
            state: if closed { IssueState::Closed } else { IssueState::Open },
            has_assignee: assigned,
            created_at,
            closed_at: closed.then_some(created_at),
        }
    }

    fn commits(referencing: usize, plain: usize) -> Vec<CommitRecord> {
        let mut commits: Vec<_> = (0..referencing)
            .map(|n| commit(n, "Dev", &format!("implement step (#{})", n % 3 + 1), 1))
            .collect();
        commits.extend((0..plain).map(|n| commit(referencing + n, "Dev", "tidy up code", 1)));
        commits
    }

    #[test]
    fn no_issues_scores_baseline_only() {
        let correlation = IssueCorrelationAnalyzer::default().correlate(&commits(0, 5), &[]);
        assert_eq!(correlation.score, 10);
        assert_eq!(correlation.commit_issue_ratio, 0.0);
        assert_eq!(correlation.issue_assignee_ratio, 0.0);
        assert_eq!(correlation.issue_closure_ratio, 0.0);
        assert_eq!(correlation.quality, IssueQuality::VeryPoor);
        assert!(!correlation.adheres);
        assert!(correlation.observations.is_empty());
    }

    #[test]
    fn well_run_project_is_excellent() {
        let issues = vec![
            issue(1, true, true),
            issue(2, true, true),
            issue(3, true, true),
            issue(4, true, false),
            issue(5, false, false),
        ];
        let correlation = IssueCorrelationAnalyzer::default().correlate(&commits(8, 2), &issues);

        assert_eq!(correlation.commit_issue_ratio, 80.0);
        assert_eq!(correlation.issue_assignee_ratio, 80.0);
        assert_eq!(correlation.issue_closure_ratio, 60.0);
        assert_eq!(correlation.score, 95);
        assert_eq!(correlation.quality, IssueQuality::Excellent);
        assert_eq!(correlation.quality.to_string(), "excellent");
        assert!(correlation.adheres);
        assert_eq!(correlation.referenced_issues, vec![1, 2, 3]);
        assert_eq!(correlation.open_issues, 2);
        assert_eq!(correlation.issues_without_assignee, 1);
        assert_eq!(correlation.observations.len(), 4);
    }

    #[test]
    fn ratio_bands_use_inclusive_lower_bounds() {
        assert_eq!(band_points(100.0, &COMMIT_REFERENCE_BANDS), 40);
        assert_eq!(band_points(79.99, &COMMIT_REFERENCE_BANDS), 30);
        assert_eq!(band_points(20.0, &ASSIGNEE_BANDS), 15);
        assert_eq!(band_points(19.99, &CLOSURE_BANDS), 0);
    }

    #[test]
    fn quality_labels() {
        assert_eq!(IssueQuality::from_score(100), IssueQuality::Excellent);
        assert_eq!(IssueQuality::from_score(60), IssueQuality::Good);
        assert_eq!(IssueQuality::from_score(59), IssueQuality::Fair);
        assert_eq!(IssueQuality::from_score(20), IssueQuality::Poor);
        assert_eq!(IssueQuality::from_score(10), IssueQuality::VeryPoor);
    }

    #[test]
    fn stored_commits_replace_unreadable_log() {
        let repo = RepositoryIdentity::new("dana", "quiz");
        let store = MemoryIssueStore::new().with_repository(
            repo.clone(),
            StoredRepository {
                issues: vec![issue(1, true, true)],
                commits: commits(2, 0),
                pull_requests: 0,
            },
        );
        let analyzer = IssueCorrelationAnalyzer::default();

        let fallback = analyzer.correlate_stored(&repo, None, &store).unwrap();
        assert_eq!(fallback.total_commits, 2);
        assert_eq!(fallback.commit_source, CommitSource::Stored);

        let live = analyzer
            .correlate_stored(&repo, Some(&commits(0, 3)), &store)
            .unwrap();
        assert_eq!(live.total_commits, 3);
        assert_eq!(live.commits_with_issue_refs, 0);
        assert_eq!(live.commit_source, CommitSource::Live);
        assert_eq!(live.total_issues, 1);
    }

    #[test]
    fn stored_label_matches_display() {
        for label in [
            IssueQuality::VeryPoor,
            IssueQuality::Poor,
            IssueQuality::Fair,
            IssueQuality::Good,
            IssueQuality::Excellent,
        ] {
            let json = serde_json::to_string(&label).unwrap();
            assert_eq!(json, format!("\"{label}\""));
            assert_eq!(serde_json::from_str::<IssueQuality>(&json).unwrap(), label);
        }
        assert_eq!(serde_json::to_string(&IssueQuality::VeryPoor).unwrap(), "\"very poor\"");
    }

    #[test]
    fn issue_json_defaults() {
        let issue: IssueRecord = serde_json::from_str(
            r#"{"number": 7, "state": "open", "created_at": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(!issue.has_assignee);
        assert!(issue.closed_at.is_none());
        assert!(!issue.is_closed());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn ratios_stay_in_range(
                referencing in 0usize..20,
                plain in 0usize..20,
                flags in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..15)
            ) {
                let issues: Vec<_> = flags
                    .iter()
                    .enumerate()
                    .map(|(n, (assigned, closed))| issue(n as u64, *assigned, *closed))
                    .collect();
                let c = IssueCorrelationAnalyzer::default().correlate(&commits(referencing, plain), &issues);
                for ratio in [c.commit_issue_ratio, c.issue_assignee_ratio, c.issue_closure_ratio] {
                    prop_assert!((0.0..=100.0).contains(&ratio));
                }
                prop_assert!(c.score >= BASELINE_POINTS && c.score <= 100);
                prop_assert_eq!(c.adheres, c.score >= ADHERENCE_THRESHOLD);
            }
        }
    }
}
