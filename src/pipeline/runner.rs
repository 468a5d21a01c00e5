//! Concurrent batch execution.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{info, warn};

use crate::config::ScorecardConfig;
use crate::git::RepositoryIdentity;
use crate::pipeline::{RepositoryAnalysis, RepositoryTarget};
use crate::quality::{QualityAggregator, RepositoryRecord};
use crate::store::{IssueStore, RecordSink, StoreError, UpsertOutcome};

/// Pause before the second sink attempt; later attempts wait proportionally longer.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// What happened to one repository of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum RepositoryOutcome {
    /// Analysed and written to the sink.
    Persisted {
        /// Repository identity.
        identity: RepositoryIdentity,
        /// Whether the record was new.
        outcome: UpsertOutcome,
        /// Some stage fell back to defaults.
        degraded: bool,
        /// Sink attempts used.
        attempts: u32,
    },
    /// Analysed, but every sink attempt failed.
    PersistFailed {
        /// Repository identity.
        identity: RepositoryIdentity,
        /// Some stage fell back to defaults.
        degraded: bool,
        /// Last sink error.
        error: String,
    },
    /// The analysis timed out or crashed.
    Failed {
        /// Clone location.
        path: PathBuf,
        /// Why no record was produced.
        error: String,
    },
}

impl RepositoryOutcome {
    /// Returns true if a record was produced.
    pub fn is_analyzed(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Returns true if the produced record carries warnings.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            Self::Persisted { degraded: true, .. } | Self::PersistFailed { degraded: true, .. }
        )
    }
}

/// Tallies of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Repositories scheduled.
    pub total: usize,
    /// Repositories that produced a record.
    pub analyzed: usize,
    /// Records with at least one warning.
    pub degraded: usize,
    /// Repositories that timed out, crashed or could not be persisted.
    pub failed: usize,
    /// Records written to the sink.
    pub persisted: usize,
    /// Per-repository outcomes in scheduling order.
    pub outcomes: Vec<RepositoryOutcome>,
}

impl BatchSummary {
    /// Builds the tallies from per-repository outcomes.
    pub fn from_outcomes(outcomes: Vec<RepositoryOutcome>) -> Self {
        let analyzed = outcomes.iter().filter(|o| o.is_analyzed()).count();
        let persisted = outcomes
            .iter()
            .filter(|o| matches!(o, RepositoryOutcome::Persisted { .. }))
            .count();
        Self {
            total: outcomes.len(),
            analyzed,
            degraded: outcomes.iter().filter(|o| o.is_degraded()).count(),
            failed: outcomes.len() - persisted,
            persisted,
            outcomes,
        }
    }

    /// Returns true if every repository was persisted.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Analyses many repositories at once and persists their records.
pub struct BatchRunner {
    analysis: Arc<dyn RepositoryAnalysis>,
    store: Arc<dyn IssueStore>,
    sink: Arc<dyn RecordSink>,
    concurrency: usize,
    timeout: Duration,
    sink_retries: u32,
    retry_backoff: Duration,
}

impl BatchRunner {
    /// Creates a runner with the default limits.
    pub fn new(
        analysis: Arc<dyn RepositoryAnalysis>,
        store: Arc<dyn IssueStore>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        let defaults = ScorecardConfig::default();
        Self {
            analysis,
            store,
            sink,
            concurrency: defaults.concurrency,
            timeout: defaults.timeout(),
            sink_retries: defaults.sink_retries,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Takes concurrency, timeout and retry limits from a configuration.
    #[must_use]
    pub fn with_limits(mut self, config: &ScorecardConfig) -> Self {
        self.concurrency = config.concurrency.max(1);
        self.timeout = config.timeout();
        self.sink_retries = config.sink_retries.max(1);
        self
    }

    /// Sets the pause between sink attempts.
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Analyses every target and reports the outcome of each.
    ///
    /// Never fails as a whole: problems are confined to the repository they
    /// happened in.
    pub async fn run(&self, targets: Vec<RepositoryTarget>) -> BatchSummary {
        info!(
            repositories = targets.len(),
            concurrency = self.concurrency,
            "starting batch"
        );
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let futs: Vec<_> = targets
            .into_iter()
            .map(|target| {
                let sem = Arc::clone(&semaphore);
                async move {
                    let permit = match sem.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            return RepositoryOutcome::Failed {
                                path: target.path,
                                error: format!("semaphore closed: {e}"),
                            }
                        }
                    };
                    match self.analyze(&target, permit).await {
                        Ok(record) => self.persist(record).await,
                        Err(error) => {
                            warn!(path = %target.path.display(), %error, "analysis failed");
                            RepositoryOutcome::Failed {
                                path: target.path,
                                error,
                            }
                        }
                    }
                }
            })
            .collect();

        let summary = BatchSummary::from_outcomes(futures::future::join_all(futs).await);
        info!(
            analyzed = summary.analyzed,
            degraded = summary.degraded,
            failed = summary.failed,
            persisted = summary.persisted,
            "batch finished"
        );
        summary
    }

    async fn analyze(
        &self,
        target: &RepositoryTarget,
        permit: OwnedSemaphorePermit,
    ) -> Result<RepositoryRecord, String> {
        let analysis = Arc::clone(&self.analysis);
        let store = Arc::clone(&self.store);
        let task_target = target.clone();
        // The permit lives as long as the blocking task, so a timed-out
        // analysis keeps its slot until it actually returns.
        let handle = tokio::task::spawn_blocking(move || {
            let record = analysis.analyze(&task_target, &*store);
            drop(permit);
            record
        });

        match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(record)) => Ok(record),
            Ok(Err(e)) if e.is_panic() => Err("analysis panicked".to_string()),
            Ok(Err(e)) => Err(format!("analysis task failed: {e}")),
            Err(_) => Err(format!("timed out after {}s", self.timeout.as_secs_f64())),
        }
    }

    async fn persist(&self, record: RepositoryRecord) -> RepositoryOutcome {
        let degraded = record.is_degraded();
        let record = Arc::new(record);
        let mut last_error: Option<StoreError> = None;

        for attempt in 1..=self.sink_retries {
            if attempt > 1 {
                tokio::time::sleep(self.retry_backoff * (attempt - 1)).await;
            }
            let sink = Arc::clone(&self.sink);
            let task_record = Arc::clone(&record);
            let result = tokio::task::spawn_blocking(move || {
                QualityAggregator.persist(&*sink, &task_record)
            })
            .await
            .unwrap_or_else(|e| Err(StoreError::Unavailable(format!("sink task failed: {e}"))));

            match result {
                Ok(outcome) => {
                    return RepositoryOutcome::Persisted {
                        identity: record.identity.clone(),
                        outcome,
                        degraded,
                        attempts: attempt,
                    };
                }
                Err(e) => {
                    warn!(repo = %record.identity, attempt, error = %e, "record write failed");
                    last_error = Some(e);
                }
            }
        }

        RepositoryOutcome::PersistFailed {
            identity: record.identity.clone(),
            degraded,
            error: last_error.map_or_else(|| "no write attempted".to_string(), |e| e.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::quality::tests::sample_record;
    use crate::quality::AnalysisWarning;
    use crate::store::{MemoryIssueStore, MemoryRecordSink, StoredRecord};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Analysis that names the record after the target's last path component.
    struct Scripted {
        delay: Option<Duration>,
        panic_on: Option<&'static str>,
        degrade: Option<&'static str>,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Scripted {
        fn new() -> Self {
            Self {
                delay: None,
                panic_on: None,
                degrade: None,
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl RepositoryAnalysis for Scripted {
        fn analyze(&self, target: &RepositoryTarget, _: &dyn IssueStore) -> RepositoryRecord {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let name = target
                .path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .to_string();
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            self.running.fetch_sub(1, Ordering::SeqCst);
            assert!(self.panic_on != Some(name.as_str()), "boom");

            let mut record = sample_record("course", &name);
            if self.degrade == Some(name.as_str()) {
                record.warnings.push(AnalysisWarning::new("log-commits", "simulated"));
            }
            record
        }
    }

    /// Sink that fails a fixed number of times before delegating, or always
    /// for one repository.
    struct FlakySink {
        failures_left: Mutex<usize>,
        broken_for: Option<&'static str>,
        broken_attempts: AtomicUsize,
        inner: MemoryRecordSink,
    }

    impl FlakySink {
        fn new(failures: usize) -> Self {
            Self {
                failures_left: Mutex::new(failures),
                broken_for: None,
                broken_attempts: AtomicUsize::new(0),
                inner: MemoryRecordSink::new(),
            }
        }

        fn broken_for(name: &'static str) -> Self {
            Self {
                broken_for: Some(name),
                ..Self::new(0)
            }
        }
    }

    impl RecordSink for FlakySink {
        fn upsert(&self, record: &RepositoryRecord) -> Result<UpsertOutcome, StoreError> {
            if self.broken_for == Some(record.identity.name.as_str()) {
                self.broken_attempts.fetch_add(1, Ordering::SeqCst);
                return Err(StoreError::Unavailable("disk full".to_string()));
            }
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(StoreError::Unavailable("disk busy".to_string()));
            }
            self.inner.upsert(record)
        }

        fn load_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
            self.inner.load_all()
        }
    }

    fn targets(names: &[&str]) -> Vec<RepositoryTarget> {
        names
            .iter()
            .map(|n| RepositoryTarget::single(PathBuf::from("/repos/course").join(n)))
            .collect()
    }

    fn runner(analysis: Scripted, sink: Arc<dyn RecordSink>) -> BatchRunner {
        BatchRunner::new(Arc::new(analysis), Arc::new(MemoryIssueStore::new()), sink)
            .with_retry_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn persists_every_repository() {
        let sink = Arc::new(MemoryRecordSink::new());
        let summary = runner(Scripted::new(), sink.clone())
            .run(targets(&["a", "b", "c"]))
            .await;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.analyzed, 3);
        assert_eq!(summary.persisted, 3);
        assert!(summary.is_complete());
        assert_eq!(sink.len(), 3);
        assert!(matches!(
            &summary.outcomes[0],
            RepositoryOutcome::Persisted { identity, attempts: 1, .. } if identity.name == "a"
        ));
    }

    #[tokio::test]
    async fn degraded_records_are_counted() {
        let mut analysis = Scripted::new();
        analysis.degrade = Some("b");
        let summary = runner(analysis, Arc::new(MemoryRecordSink::new()))
            .run(targets(&["a", "b"]))
            .await;

        assert_eq!(summary.degraded, 1);
        assert_eq!(summary.persisted, 2);
    }

    #[tokio::test]
    async fn flaky_sink_is_retried() {
        let summary = runner(Scripted::new(), Arc::new(FlakySink::new(2)))
            .run(targets(&["a"]))
            .await;

        assert!(matches!(
            summary.outcomes[0],
            RepositoryOutcome::Persisted { attempts: 3, .. }
        ));
    }

    #[tokio::test]
    async fn exhausted_retries_fail_only_that_repository() {
        let sink = Arc::new(FlakySink::broken_for("a"));
        let summary = runner(Scripted::new(), sink.clone())
            .run(targets(&["a", "b"]))
            .await;

        assert_eq!(summary.analyzed, 2);
        assert_eq!(summary.persisted, 1);
        assert_eq!(summary.failed, 1);
        match &summary.outcomes[0] {
            RepositoryOutcome::PersistFailed { identity, error, .. } => {
                assert_eq!(identity.name, "a");
                assert!(error.contains("disk full"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(matches!(
            &summary.outcomes[1],
            RepositoryOutcome::Persisted { identity, attempts: 1, .. } if identity.name == "b"
        ));
        let retries = ScorecardConfig::default().sink_retries as usize;
        assert_eq!(sink.broken_attempts.load(Ordering::SeqCst), retries);
        assert_eq!(sink.inner.len(), 1);
    }

    #[tokio::test]
    async fn panicking_analysis_fails_one_repository() {
        let mut analysis = Scripted::new();
        analysis.panic_on = Some("b");
        let summary = runner(analysis, Arc::new(MemoryRecordSink::new()))
            .run(targets(&["a", "b", "c"]))
            .await;

        assert_eq!(summary.analyzed, 2);
        assert_eq!(summary.failed, 1);
        assert!(matches!(
            &summary.outcomes[1],
            RepositoryOutcome::Failed { error, .. } if error.contains("panicked")
        ));
    }

    #[tokio::test]
    async fn slow_analysis_times_out() {
        let mut analysis = Scripted::new();
        analysis.delay = Some(Duration::from_millis(300));
        let mut runner = runner(analysis, Arc::new(MemoryRecordSink::new()));
        runner.timeout = Duration::from_millis(20);

        let summary = runner.run(targets(&["a"])).await;
        assert_eq!(summary.failed, 1);
        assert!(matches!(
            &summary.outcomes[0],
            RepositoryOutcome::Failed { error, .. } if error.contains("timed out")
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrency_is_bounded() {
        let mut analysis = Scripted::new();
        analysis.delay = Some(Duration::from_millis(30));
        let analysis = Arc::new(analysis);
        let config = ScorecardConfig {
            concurrency: 2,
            ..ScorecardConfig::default()
        };
        let runner = BatchRunner::new(
            analysis.clone(),
            Arc::new(MemoryIssueStore::new()),
            Arc::new(MemoryRecordSink::new()),
        )
        .with_limits(&config);

        let summary = runner.run(targets(&["a", "b", "c", "d", "e"])).await;
        assert_eq!(summary.persisted, 5);
        assert!(analysis.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn timed_out_analyses_keep_their_slot() {
        let mut analysis = Scripted::new();
        analysis.delay = Some(Duration::from_millis(150));
        let analysis = Arc::new(analysis);
        let config = ScorecardConfig {
            concurrency: 1,
            ..ScorecardConfig::default()
        };
        let mut runner = BatchRunner::new(
            analysis.clone(),
            Arc::new(MemoryIssueStore::new()),
            Arc::new(MemoryRecordSink::new()),
        )
        .with_limits(&config);
        runner.timeout = Duration::from_millis(20);

        let summary = runner.run(targets(&["a", "b", "c"])).await;
        assert_eq!(summary.failed, 3);
        assert_eq!(analysis.peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn summary_of_nothing_is_complete() {
        let summary = BatchSummary::from_outcomes(Vec::new());
        assert_eq!(summary, BatchSummary::default());
        assert!(summary.is_complete());
    }
}
