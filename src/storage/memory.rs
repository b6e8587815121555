//! In-memory storage used by tests and dry runs

use crate::cluster::{CrawlSnapshot, SNAPSHOT_RETENTION};
use crate::storage::traits::{SnapshotStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Storage backend that keeps everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStorage {
    // newest first
    snapshots: HashMap<String, Vec<CrawlSnapshot>>,
    runs: Vec<RunRecord>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// All runs recorded so far, oldest first
    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }
}

impl SnapshotStore for MemoryStorage {
    fn load_history(&self, origin: &str) -> StorageResult<Vec<CrawlSnapshot>> {
        Ok(self.snapshots.get(origin).cloned().unwrap_or_default())
    }

    fn append_snapshot(&mut self, origin: &str, snapshot: &CrawlSnapshot) -> StorageResult<()> {
        let history = self.snapshots.entry(origin.to_string()).or_default();
        // ties go to the latest append
        let position = history
            .iter()
            .position(|s| s.taken_at <= snapshot.taken_at)
            .unwrap_or(history.len());
        history.insert(position, snapshot.clone());
        history.truncate(SNAPSHOT_RETENTION);
        Ok(())
    }

    fn start_run(
        &mut self,
        origin: &str,
        config_hash: &str,
        started_at: DateTime<Utc>,
    ) -> StorageResult<i64> {
        let id = self.runs.len() as i64 + 1;
        self.runs.push(RunRecord {
            id,
            origin: origin.to_string(),
            started_at: started_at.to_rfc3339(),
            finished_at: None,
            config_hash: config_hash.to_string(),
            status: RunStatus::Running,
            pages_crawled: 0,
        });
        Ok(id)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_crawled: usize,
        finished_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let run = self
            .runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or(StorageError::RunNotFound(run_id))?;
        run.status = status;
        run.pages_crawled = pages_crawled;
        run.finished_at = Some(finished_at.to_rfc3339());
        Ok(())
    }

    fn latest_run(&self, origin: &str) -> StorageResult<Option<RunRecord>> {
        Ok(self.runs.iter().rev().find(|r| r.origin == origin).cloned())
    }
}
