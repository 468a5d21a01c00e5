//! In-memory stores.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;

use crate::git::{CommitRecord, RepositoryIdentity};
use crate::issues::IssueRecord;
use crate::quality::RepositoryRecord;
use crate::store::{
    IssueStore, RecordSink, StoreError, StoredRecord, StoredRepository, UpsertOutcome,
};

/// Issue store held entirely in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryIssueStore {
    repositories: BTreeMap<RepositoryIdentity, StoredRepository>,
}

impl MemoryIssueStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the data of one repository.
    #[must_use]
    pub fn with_repository(mut self, repo: RepositoryIdentity, data: StoredRepository) -> Self {
        self.repositories.insert(repo, data);
        self
    }
}

impl IssueStore for MemoryIssueStore {
    fn issues_for(&self, repo: &RepositoryIdentity) -> Result<Vec<IssueRecord>, StoreError> {
        Ok(self
            .repositories
            .get(repo)
            .map(|r| r.issues.clone())
            .unwrap_or_default())
    }

    fn commits_for(&self, repo: &RepositoryIdentity) -> Result<Vec<CommitRecord>, StoreError> {
        Ok(self
            .repositories
            .get(repo)
            .map(|r| r.commits.clone())
            .unwrap_or_default())
    }

    fn pull_request_count(&self, repo: &RepositoryIdentity) -> Result<usize, StoreError> {
        Ok(self.repositories.get(repo).map_or(0, |r| r.pull_requests))
    }
}

/// Record sink held in memory.
#[derive(Debug, Default)]
pub struct MemoryRecordSink {
    records: Mutex<BTreeMap<RepositoryIdentity, StoredRecord>>,
}

impl MemoryRecordSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the stored record of one repository.
    pub fn get(&self, repo: &RepositoryIdentity) -> Option<StoredRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(repo)
            .cloned()
    }
}

impl RecordSink for MemoryRecordSink {
    fn upsert(&self, record: &RepositoryRecord) -> Result<UpsertOutcome, StoreError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let (stored, outcome) = StoredRecord::upsert(
            records.get(&record.identity),
            record.clone(),
            Utc::now(),
        );
        records.insert(record.identity.clone(), stored);
        Ok(outcome)
    }

    fn load_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect())
    }
}
