//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::cluster::CrawlSnapshot;
use crate::storage::{RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence for audit runs and per-origin cluster snapshots
///
/// Snapshot history is returned newest first, and at most
/// [`SNAPSHOT_RETENTION`](crate::cluster::SNAPSHOT_RETENTION) snapshots are
/// kept per origin.
pub trait SnapshotStore: Send {
    // ===== Snapshots =====

    /// Loads the stored snapshots for `origin`, newest first
    fn load_history(&self, origin: &str) -> StorageResult<Vec<CrawlSnapshot>>;

    /// Stores a snapshot and drops the oldest ones beyond the retention limit
    fn append_snapshot(&mut self, origin: &str, snapshot: &CrawlSnapshot) -> StorageResult<()>;

    // ===== Run Management =====

    /// Records the start of an audit run
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn start_run(
        &mut self,
        origin: &str,
        config_hash: &str,
        started_at: DateTime<Utc>,
    ) -> StorageResult<i64>;

    /// Marks a run as finished
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_crawled: usize,
        finished_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Gets the most recent run for `origin`
    fn latest_run(&self, origin: &str) -> StorageResult<Option<RunRecord>>;
}
