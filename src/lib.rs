//! Licitace-Watch: a change watcher for a municipal flat-auction page
//!
//! This crate fetches the listing page, extracts auction entries, compares them
//! with the snapshot from the previous run, and sends a notification when new
//! entries of interesting flat sizes show up.

pub mod config;
pub mod listing;
pub mod notify;
pub mod storage;
pub mod watcher;

use thiserror::Error;

/// Main error type for Licitace-Watch operations
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extract(#[from] watcher::ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Notification error: {0}")]
    Notify(#[from] notify::NotifyError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

// Re-export commonly used types
pub use config::Config;
pub use listing::{compute_relevant_new, ColdStart, ListingRecord, TargetSizes};
pub use watcher::{watch, RunReport, RunStatus, Watcher};
