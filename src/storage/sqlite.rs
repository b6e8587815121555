//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the SnapshotStore trait.

use crate::cluster::{ClusterSummary, CrawlSnapshot, SNAPSHOT_RETENTION};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{SnapshotStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::SiteGaugeError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SiteGaugeError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SiteGaugeError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SiteGaugeError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort as text
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StorageError::InvalidTimestamp(raw.to_string()))
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        origin: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?).unwrap_or(RunStatus::Failed),
        pages_crawled: row.get::<_, i64>(6)? as usize,
    })
}

impl SnapshotStore for SqliteStorage {
    // ===== Snapshots =====

    fn load_history(&self, origin: &str) -> StorageResult<Vec<CrawlSnapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT taken_at, clusters_json FROM snapshots WHERE origin = ?1
             ORDER BY taken_at DESC, id DESC LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(params![origin, SNAPSHOT_RETENTION as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(taken_at, json)| {
                let clusters: Vec<ClusterSummary> = serde_json::from_str(&json)?;
                Ok(CrawlSnapshot {
                    taken_at: parse_timestamp(&taken_at)?,
                    clusters,
                })
            })
            .collect()
    }

    fn append_snapshot(&mut self, origin: &str, snapshot: &CrawlSnapshot) -> StorageResult<()> {
        let json = serde_json::to_string(&snapshot.clusters)?;
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO snapshots (origin, taken_at, clusters_json) VALUES (?1, ?2, ?3)",
            params![origin, format_timestamp(snapshot.taken_at), json],
        )?;

        let removed = tx.execute(
            "DELETE FROM snapshots WHERE origin = ?1 AND id NOT IN (
                SELECT id FROM snapshots WHERE origin = ?1
                ORDER BY taken_at DESC, id DESC LIMIT ?2
            )",
            params![origin, SNAPSHOT_RETENTION as i64],
        )?;

        tx.commit()?;

        if removed > 0 {
            tracing::debug!("Pruned {} old snapshots for {}", removed, origin);
        }
        Ok(())
    }

    // ===== Run Management =====

    fn start_run(
        &mut self,
        origin: &str,
        config_hash: &str,
        started_at: DateTime<Utc>,
    ) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO runs (origin, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                origin,
                format_timestamp(started_at),
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_crawled: usize,
        finished_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_crawled = ?3 WHERE id = ?4",
            params![
                status.to_db_string(),
                format_timestamp(finished_at),
                pages_crawled as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn latest_run(&self, origin: &str) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, origin, started_at, finished_at, config_hash, status, pages_crawled
                 FROM runs WHERE origin = ?1 ORDER BY id DESC LIMIT 1",
                params![origin],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn snapshot(minute: i64, count: usize) -> CrawlSnapshot {
        CrawlSnapshot {
            taken_at: at(minute),
            clusters: vec![ClusterSummary {
                signature: "1|Product {#}|h11|empty|mid".to_string(),
                count,
                missing_description: count,
                missing_h1: 0,
                multiple_h1: 0,
                thin: 0,
                missing_description_rate: 1.0,
                missing_h1_rate: 0.0,
                multiple_h1_rate: 0.0,
                thin_rate: 0.0,
            }],
        }
    }

    #[test]
    fn test_empty_history() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.load_history("https://example.com").unwrap().is_empty());
    }

    #[test]
    fn test_history_newest_first() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.append_snapshot("https://example.com", &snapshot(1, 1)).unwrap();
        storage.append_snapshot("https://example.com", &snapshot(2, 2)).unwrap();

        let history = storage.load_history("https://example.com").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].taken_at, at(2));
        assert_eq!(history[0].clusters[0].count, 2);
        assert_eq!(history[1], snapshot(1, 1));
    }

    #[test]
    fn test_retains_five_per_origin() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for i in 0..8 {
            storage.append_snapshot("https://a.com", &snapshot(i, i as usize)).unwrap();
        }
        storage.append_snapshot("https://b.com", &snapshot(0, 9)).unwrap();

        let history = storage.load_history("https://a.com").unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].taken_at, at(7));
        assert_eq!(history[4].taken_at, at(3));

        let stored: i64 = storage
            .conn
            .query_row(
                "SELECT COUNT(*) FROM snapshots WHERE origin = 'https://a.com'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, 5);
        assert_eq!(storage.load_history("https://b.com").unwrap().len(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitegauge.db");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage.append_snapshot("https://example.com", &snapshot(1, 3)).unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        let history = storage.load_history("https://example.com").unwrap();
        assert_eq!(history, vec![snapshot(1, 3)]);
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage.start_run("https://example.com", "abc123", at(0)).unwrap();

        let running = storage.latest_run("https://example.com").unwrap().unwrap();
        assert_eq!(running.id, id);
        assert_eq!(running.status, RunStatus::Running);
        assert!(running.finished_at.is_none());

        storage.finish_run(id, RunStatus::Completed, 12, at(1)).unwrap();
        let finished = storage.latest_run("https://example.com").unwrap().unwrap();
        assert_eq!(finished.status, RunStatus::Completed);
        assert_eq!(finished.pages_crawled, 12);
        assert_eq!(finished.config_hash, "abc123");

        assert!(storage.latest_run("https://other.com").unwrap().is_none());
    }

    #[test]
    fn test_finish_unknown_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.finish_run(99, RunStatus::Completed, 0, at(0)),
            Err(StorageError::RunNotFound(99))
        ));
    }
}
