//! Storage traits and error types
//!
//! This module defines the trait interface for snapshot backends and
//! associated error types.

use crate::listing::ListingRecord;
use crate::storage::RunLogEntry;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lease error: {0}")]
    Lease(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for snapshot backends
///
/// `load` and `save` are required. Leasing and the run log have permissive
/// defaults so a backend without them still works: every lease is granted
/// and runs are not recorded.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Loads the most recent snapshot, `None` if nothing was saved yet
    async fn load(&self) -> StorageResult<Option<Vec<ListingRecord>>>;

    /// Replaces the stored snapshot with `records`
    async fn save(&self, records: &[ListingRecord]) -> StorageResult<()>;

    /// Tries to take the run lease for `ttl`
    ///
    /// Returns false if another holder owns an unexpired lease.
    async fn acquire_lease(&self, holder: &str, ttl: Duration) -> StorageResult<bool> {
        let _ = (holder, ttl);
        Ok(true)
    }

    /// Releases the lease if `holder` still owns it
    async fn release_lease(&self, holder: &str) -> StorageResult<()> {
        let _ = holder;
        Ok(())
    }

    /// Appends a run to the run log
    async fn record_run(&self, entry: &RunLogEntry) -> StorageResult<()> {
        let _ = entry;
        Ok(())
    }

    /// Returns up to `limit` runs, newest first
    async fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunLogEntry>> {
        let _ = limit;
        Ok(Vec::new())
    }
}
