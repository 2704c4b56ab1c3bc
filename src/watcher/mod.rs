//! Watcher module for a single watch run
//!
//! This module contains the run logic, including:
//! - HTTP fetching of the listing page
//! - Extraction of listing records with the carry-over scan
//! - Coordination of fetch, diff, notification and snapshot storage

mod coordinator;
mod fetcher;
mod parser;

pub use crate::storage::RunStatus;
pub use coordinator::{RunReport, WatchSettings, Watcher};
pub use fetcher::{build_http_client, FetchError, Fetcher, HttpFetcher};
pub use parser::{fold_units, ExtractError, ExtractOptions, Extractor, TextUnit};

use crate::config::Config;
use crate::WatchError;

/// Runs one complete watch cycle for `config`
///
/// This is the main entry point for a scheduled invocation. It builds the
/// collaborators from the configuration and performs a single run.
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `config_hash` - Hash of the configuration file, stored in the run log
///
/// # Returns
///
/// * `Ok(RunReport)` - The run happened (it may still report failures)
/// * `Err(WatchError)` - A collaborator could not be built
pub async fn watch(config: &Config, config_hash: Option<String>) -> Result<RunReport, WatchError> {
    let watcher = Watcher::from_config(config, config_hash)?;
    Ok(watcher.run_once().await)
}
