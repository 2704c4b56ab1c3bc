//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the SnapshotStore trait.
//! Besides the latest snapshot it keeps a short snapshot history, the run
//! log and the run lease.
//!
//! `rusqlite` is synchronous, so every query runs on the blocking thread pool
//! through `spawn_blocking`.

use crate::listing::ListingRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{SnapshotStore, StorageError, StorageResult};
use crate::storage::{RunLogEntry, RunStatus};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Name of the only lease row
const RUN_LEASE: &str = "run";

/// SQLite snapshot backend
pub struct SqliteSnapshotStore {
    conn: Arc<Mutex<Connection>>,
    history: u32,
}

impl SqliteSnapshotStore {
    /// Opens (or creates) the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `history` - Number of snapshots kept, at least 1
    pub fn open(path: &Path, history: u32) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            history: history.max(1),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory(history: u32) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            history: history.max(1),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        lock_connection(&self.conn)
    }

    /// Runs `f` with the connection on the blocking thread pool
    async fn with_connection<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = lock_connection(&conn)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StorageError::Database(format!("blocking task failed: {}", e)))?
    }

    /// Number of snapshots currently kept
    pub fn snapshot_count(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn lock_connection(conn: &Mutex<Connection>) -> StorageResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| StorageError::Database("connection mutex poisoned".to_string()))
}

/// Unix timestamp `ttl` from now, or a lease error if it does not fit
fn lease_expiry(now: i64, ttl: Duration) -> StorageResult<i64> {
    i64::try_from(ttl.as_secs())
        .ok()
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| StorageError::Lease(format!("lease lifetime {:?} is out of range", ttl)))
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn load(&self) -> StorageResult<Option<Vec<ListingRecord>>> {
        let document: Option<String> = self
            .with_connection(|conn| {
                Ok(conn
                    .query_row(
                        "SELECT document FROM snapshots ORDER BY id DESC LIMIT 1",
                        [],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;

        match document {
            Some(document) => {
                let records = serde_json::from_str(&document)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(records))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, records: &[ListingRecord]) -> StorageResult<()> {
        let document = serde_json::to_string(records)?;
        let record_count = records.len() as i64;
        let history = self.history;
        let now = Utc::now().to_rfc3339();

        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO snapshots (taken_at, record_count, document) VALUES (?1, ?2, ?3)",
                params![now, record_count, document],
            )?;
            tx.execute(
                "DELETE FROM snapshots WHERE id NOT IN
                 (SELECT id FROM snapshots ORDER BY id DESC LIMIT ?1)",
                params![history],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn acquire_lease(&self, holder: &str, ttl: Duration) -> StorageResult<bool> {
        let now = Utc::now().timestamp();
        let expires_at = lease_expiry(now, ttl)?;
        let holder = holder.to_string();

        self.with_connection(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing: Option<(String, i64)> = tx
                .query_row(
                    "SELECT holder, expires_at FROM leases WHERE name = ?1",
                    params![RUN_LEASE],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            if let Some((current, current_expiry)) = existing {
                if current != holder && current_expiry > now {
                    return Ok(false);
                }
            }

            tx.execute(
                "INSERT OR REPLACE INTO leases (name, holder, expires_at) VALUES (?1, ?2, ?3)",
                params![RUN_LEASE, holder, expires_at],
            )?;
            tx.commit()?;

            Ok(true)
        })
        .await
    }

    async fn release_lease(&self, holder: &str) -> StorageResult<()> {
        let holder = holder.to_string();
        self.with_connection(move |conn| {
            conn.execute(
                "DELETE FROM leases WHERE name = ?1 AND holder = ?2",
                params![RUN_LEASE, holder],
            )?;
            Ok(())
        })
        .await
    }

    async fn record_run(&self, entry: &RunLogEntry) -> StorageResult<()> {
        let entry = entry.clone();
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO runs (started_at, finished_at, config_hash, status, current_count,
                 new_count, email_sent, message) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    entry.started_at,
                    entry.finished_at,
                    entry.config_hash,
                    entry.status.to_db_string(),
                    entry.current_count as i64,
                    entry.new_count as i64,
                    entry.email_sent,
                    entry.message,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunLogEntry>> {
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT started_at, finished_at, config_hash, status, current_count, new_count,
                 email_sent, message FROM runs ORDER BY id DESC LIMIT ?1",
            )?;

            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok(RunLogEntry {
                    started_at: row.get(0)?,
                    finished_at: row.get(1)?,
                    config_hash: row.get(2)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(3)?)
                        .unwrap_or(RunStatus::Completed),
                    current_count: row.get::<_, i64>(4)? as usize,
                    new_count: row.get::<_, i64>(5)? as usize,
                    email_sent: row.get(6)?,
                    message: row.get(7)?,
                })
            })?;

            let mut runs = Vec::new();
            for run in rows {
                runs.push(run?);
            }
            Ok(runs)
        })
        .await
    }
}
