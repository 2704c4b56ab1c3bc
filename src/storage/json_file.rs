//! JSON document snapshot store
//!
//! The snapshot is a pretty-printed JSON array of records. Writes go through
//! a temporary sibling file that is renamed over the target. The run lease
//! lives in a `<file>.lock` sibling.

use crate::listing::ListingRecord;
use crate::storage::traits::{SnapshotStore, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Contents of the lock file
#[derive(Debug, Serialize, Deserialize)]
struct LeaseFile {
    holder: String,
    expires_at: DateTime<Utc>,
}

/// Record as found on disk
///
/// Older snapshot files carry `"size": null` for dated blocks seen before any
/// size. Those never match a current record and are dropped on load.
#[derive(Debug, Deserialize)]
struct StoredRecord {
    size: Option<String>,
    description: String,
    date: String,
    #[serde(default)]
    link: Option<String>,
}

/// Snapshot store backed by a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn lock_path(&self) -> PathBuf {
        self.sibling(".lock")
    }

    async fn read_lease(&self) -> StorageResult<Option<LeaseFile>> {
        match tokio::fs::read_to_string(self.lock_path()).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(lease) => Ok(Some(lease)),
                Err(e) => {
                    // An unreadable lock is treated as expired
                    tracing::warn!("Ignoring corrupt lock file {:?}: {}", self.lock_path(), e);
                    Ok(None)
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_lock(&self, lease: &LeaseFile) -> StorageResult<bool> {
        let content = serde_json::to_vec(lease)?;
        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.lock_path())
            .await;

        match opened {
            Ok(mut file) => {
                file.write_all(&content).await?;
                file.flush().await?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> StorageResult<Option<Vec<ListingRecord>>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: Vec<StoredRecord> = serde_json::from_str(&content).map_err(|e| {
            StorageError::Serialization(format!("{}: {}", self.path.display(), e))
        })?;

        let total = stored.len();
        let records: Vec<ListingRecord> = stored
            .into_iter()
            .filter_map(|record| {
                Some(ListingRecord {
                    size: record.size?,
                    description: record.description,
                    date: record.date,
                    link: record.link,
                })
            })
            .collect();

        if records.len() < total {
            tracing::warn!(
                "Dropped {} records without a size from {}",
                total - records.len(),
                self.path.display()
            );
        }

        Ok(Some(records))
    }

    async fn save(&self, records: &[ListingRecord]) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(records)?;
        let tmp_path = self.sibling(".tmp");

        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        tracing::debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    async fn acquire_lease(&self, holder: &str, ttl: Duration) -> StorageResult<bool> {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| StorageError::Lease(format!("lease lifetime {:?} is out of range", ttl)))?;
        let lease = LeaseFile {
            holder: holder.to_string(),
            expires_at,
        };

        if self.create_lock(&lease).await? {
            return Ok(true);
        }

        match self.read_lease().await? {
            Some(existing) if existing.holder != holder && existing.expires_at > Utc::now() => {
                Ok(false)
            }
            _ => {
                // Expired, corrupt or our own: take it over
                match tokio::fs::remove_file(self.lock_path()).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                self.create_lock(&lease).await
            }
        }
    }

    async fn release_lease(&self, holder: &str) -> StorageResult<()> {
        match self.read_lease().await? {
            Some(existing) if existing.holder != holder => {
                tracing::warn!("Lease is held by {}, not releasing", existing.holder);
                Ok(())
            }
            _ => match tokio::fs::remove_file(self.lock_path()).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            },
        }
    }
}
