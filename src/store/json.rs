//! JSON file backed stores.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::git::{CommitRecord, RepositoryIdentity};
use crate::issues::IssueRecord;
use crate::quality::RepositoryRecord;
use crate::store::{
    IssueStore, RecordSink, StoreError, StoredRecord, StoredRepository, UpsertOutcome,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct IssueFile {
    #[serde(default)]
    repositories: BTreeMap<String, StoredRepository>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RecordFile {
    #[serde(default)]
    records: BTreeMap<String, StoredRecord>,
}

fn read_json<T>(path: &Path) -> Result<Option<T>, StoreError>
where
    T: for<'de> Deserialize<'de>,
{
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Issue-tracker export read from a JSON file.
///
/// The file maps `owner/name` to issues, commits and a pull-request count.
/// A missing file is an empty store.
#[derive(Debug, Default)]
pub struct JsonIssueStore {
    repositories: BTreeMap<String, StoredRepository>,
}

impl JsonIssueStore {
    /// Loads the store from `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        match read_json::<IssueFile>(path)? {
            Some(file) => {
                debug!(path = %path.display(), repositories = file.repositories.len(), "loaded issue store");
                Ok(Self {
                    repositories: file.repositories,
                })
            }
            None => {
                info!(path = %path.display(), "issue store not found, assuming no issues");
                Ok(Self::default())
            }
        }
    }

    /// Parses a store from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let file: IssueFile = serde_json::from_str(json).map_err(|source| StoreError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Ok(Self {
            repositories: file.repositories,
        })
    }

    fn lookup(&self, repo: &RepositoryIdentity) -> Option<&StoredRepository> {
        self.repositories.get(&repo.to_string())
    }
}

impl IssueStore for JsonIssueStore {
    fn issues_for(&self, repo: &RepositoryIdentity) -> Result<Vec<IssueRecord>, StoreError> {
        Ok(self.lookup(repo).map(|r| r.issues.clone()).unwrap_or_default())
    }

    fn commits_for(&self, repo: &RepositoryIdentity) -> Result<Vec<CommitRecord>, StoreError> {
        Ok(self.lookup(repo).map(|r| r.commits.clone()).unwrap_or_default())
    }

    fn pull_request_count(&self, repo: &RepositoryIdentity) -> Result<usize, StoreError> {
        Ok(self.lookup(repo).map_or(0, |r| r.pull_requests))
    }
}

/// Record sink persisted as a single JSON document.
///
/// Every upsert rewrites the document through a temporary file in the same
/// directory, so readers never observe a partial write.
#[derive(Debug)]
pub struct JsonRecordSink {
    path: PathBuf,
    records: Mutex<BTreeMap<String, StoredRecord>>,
}

impl JsonRecordSink {
    /// Opens the sink at `path`, loading existing records if the file exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let records = read_json::<RecordFile>(path)?
            .map(|file| file.records)
            .unwrap_or_default();
        debug!(path = %path.display(), records = records.len(), "opened record sink");

        Ok(Self {
            path: path.to_path_buf(),
            records: Mutex::new(records),
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, records: &BTreeMap<String, StoredRecord>) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(io_error)?;

        let file = RecordFile {
            records: records.clone(),
        };
        let tmp = NamedTempFile::new_in(&dir).map_err(io_error)?;
        let mut writer = BufWriter::new(tmp);
        serde_json::to_writer_pretty(&mut writer, &file)?;
        writer.flush().map_err(io_error)?;

        let tmp = writer
            .into_inner()
            .map_err(|e| io_error(e.into_error()))?;
        tmp.persist(&self.path).map_err(|e| io_error(e.error))?;
        Ok(())
    }
}

impl RecordSink for JsonRecordSink {
    fn upsert(&self, record: &RepositoryRecord) -> Result<UpsertOutcome, StoreError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let key = record.identity.to_string();

        let (stored, outcome) = StoredRecord::upsert(records.get(&key), record.clone(), Utc::now());
        let mut updated = records.clone();
        updated.insert(key, stored);

        // Only commit to memory once the file is on disk
        self.write(&updated)?;
        *records = updated;
        Ok(outcome)
    }

    fn load_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.values().cloned().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::quality::tests::sample_record;
    use tempfile::TempDir;

    const ISSUES: &str = r#"{
        "repositories": {
            "alice/shop": {
                "issues": [
                    {"number": 1, "title": "Login", "state": "closed", "has_assignee": true,
                     "created_at": "2024-03-01T10:00:00Z", "closed_at": "2024-03-04T10:00:00Z"},
                    {"number": 2, "title": "Cart", "state": "open",
                     "created_at": "2024-03-02T10:00:00Z"}
                ],
                "commits": [
                    {"hash": "abc", "author": "Alice", "date": "2024-03-03T09:00:00+01:00",
                     "message": "Fixes #1"}
                ],
                "pull_requests": 2
            }
        }
    }"#;

    #[test]
    fn issue_store_lookup() {
        let store = JsonIssueStore::from_json(ISSUES).unwrap();
        let repo = RepositoryIdentity::new("alice", "shop");
        let issues = store.issues_for(&repo).unwrap();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].has_assignee);
        assert!(!issues[1].has_assignee);
        assert_eq!(store.commits_for(&repo).unwrap().len(), 1);
        assert_eq!(store.pull_request_count(&repo).unwrap(), 2);
    }

    #[test]
    fn unknown_repository_is_empty() {
        let store = JsonIssueStore::from_json(ISSUES).unwrap();
        let repo = RepositoryIdentity::new("bob", "game");
        assert!(store.issues_for(&repo).unwrap().is_empty());
        assert!(store.commits_for(&repo).unwrap().is_empty());
        assert_eq!(store.pull_request_count(&repo).unwrap(), 0);
    }

    #[test]
    fn missing_issue_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = JsonIssueStore::open(&dir.path().join("issues.json")).unwrap();
        let repo = RepositoryIdentity::new("alice", "shop");
        assert!(store.issues_for(&repo).unwrap().is_empty());
    }

    #[test]
    fn malformed_issue_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("issues.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonIssueStore::open(&path),
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn upsert_creates_then_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("scorecard.json");
        let sink = JsonRecordSink::open(&path).unwrap();

        let record = sample_record("alice", "shop");
        assert_eq!(sink.upsert(&record).unwrap(), UpsertOutcome::Created);
        let first = sink.load_all().unwrap();

        assert_eq!(sink.upsert(&record).unwrap(), UpsertOutcome::Replaced);
        let second = sink.load_all().unwrap();

        assert_eq!(second.len(), 1);
        assert_eq!(second[0].created_at, first[0].created_at);
        assert!(second[0].updated_at >= first[0].updated_at);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scorecard.json");
        {
            let sink = JsonRecordSink::open(&path).unwrap();
            sink.upsert(&sample_record("bob", "game")).unwrap();
            sink.upsert(&sample_record("alice", "shop")).unwrap();
        }

        let reopened = JsonRecordSink::open(&path).unwrap();
        let records = reopened.load_all().unwrap();
        let identities: Vec<String> = records.iter().map(|r| r.record.identity.to_string()).collect();
        assert_eq!(identities, vec!["alice/shop", "bob/game"]);

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["records"]["alice/shop"]["record"].is_object());
        assert!(raw["records"]["alice/shop"]["created_at"].is_string());
    }
}
