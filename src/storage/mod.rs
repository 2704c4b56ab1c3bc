//! Storage module for persisting snapshots between runs
//!
//! This module handles everything that has to survive a process exit:
//! - The snapshot of listing records from the last run
//! - A lease that keeps overlapping runs apart
//! - A log of past runs (SQLite backend only)

mod json_file;
mod schema;
mod sqlite;
mod traits;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteSnapshotStore;
pub use traits::{SnapshotStore, StorageError, StorageResult};

use crate::config::StoreConfig;
use serde::Serialize;

/// Opens the snapshot store described by the configuration
///
/// # Arguments
///
/// * `config` - The `[store]` configuration section
///
/// # Returns
///
/// * `Ok(Box<dyn SnapshotStore>)` - Ready-to-use store
/// * `Err(StorageError)` - The SQLite database could not be opened
pub fn open_store(config: &StoreConfig) -> StorageResult<Box<dyn SnapshotStore>> {
    match config {
        StoreConfig::JsonFile { path } => Ok(Box::new(JsonFileStore::new(path))),
        StoreConfig::Sqlite { path, history } => {
            let store = SqliteSnapshotStore::open(std::path::Path::new(path), *history)?;
            Ok(Box::new(store))
        }
    }
}

/// Final status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// Run finished, whether or not anything new was found
    Completed,

    /// Run finished but the snapshot could not be saved
    PartialFailure,

    /// Another run held the lease
    Skipped,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::PartialFailure => "partial-failure",
            Self::Skipped => "skipped",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "partial-failure" => Some(Self::PartialFailure),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// One row of the run log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLogEntry {
    pub started_at: String,
    pub finished_at: String,
    pub config_hash: Option<String>,
    pub status: RunStatus,
    pub current_count: usize,
    pub new_count: usize,
    pub email_sent: bool,
    pub message: String,
}
