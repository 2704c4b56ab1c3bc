//! Watcher coordinator - one run of the listing watch
//!
//! A run is a straight sequence over the collaborators:
//! - Take the single-run lease from the store
//! - Fetch the page and extract the current records
//! - Load the previous snapshot and compute the relevant new entries
//! - Notify, save the new snapshot, record the run
//!
//! Collaborator failures never abort a run. They end up in the `RunReport`.

use crate::config::{Config, WatchConfig};
use crate::listing::{compute_relevant_new, ColdStart, ListingRecord, TargetSizes};
use crate::notify::{build_notifier, Notifier};
use crate::storage::{open_store, RunLogEntry, RunStatus, SnapshotStore};
use crate::watcher::fetcher::{build_http_client, Fetcher, HttpFetcher};
use crate::watcher::parser::Extractor;
use crate::WatchError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::time::Duration;

const MESSAGE_EXECUTED: &str = "Scraper executed";
const MESSAGE_SKIPPED: &str = "Skipped: another run holds the lease";
const MESSAGE_SAVE_FAILED: &str = "Scraper executed, snapshot not saved";

/// Outcome of one run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub status: RunStatus,
    pub message: String,
    pub email_sent: bool,
    pub current_count: usize,
    pub new_count: usize,
    /// Entries that qualified for the notification
    pub relevant: Vec<ListingRecord>,
    /// Records extracted in this run
    pub data: Vec<ListingRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    fn started(started_at: DateTime<Utc>) -> Self {
        Self {
            status: RunStatus::Completed,
            message: MESSAGE_EXECUTED.to_string(),
            email_sent: false,
            current_count: 0,
            new_count: 0,
            relevant: Vec::new(),
            data: Vec::new(),
            fetch_error: None,
            notify_error: None,
            store_error: None,
            started_at,
            finished_at: started_at,
        }
    }

    /// Whether a notification was delivered in this run
    pub fn notified(&self) -> bool {
        self.email_sent
    }

    /// False only when the run could not persist its snapshot
    pub fn is_success(&self) -> bool {
        self.status != RunStatus::PartialFailure
    }

    fn to_log_entry(&self, config_hash: Option<&str>) -> RunLogEntry {
        RunLogEntry {
            started_at: self.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            finished_at: self.finished_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            config_hash: config_hash.map(str::to_string),
            status: self.status,
            current_count: self.current_count,
            new_count: self.new_count,
            email_sent: self.email_sent,
            message: self.message.clone(),
        }
    }
}

/// Change-detection settings for a `Watcher`
#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub target_sizes: TargetSizes,
    pub cold_start: ColdStart,
    pub write_snapshot_on_fetch_failure: bool,
    /// Lease lifetime, `None` runs without a lease
    pub lease: Option<Duration>,
}

impl WatchSettings {
    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            target_sizes: config.target_sizes.clone(),
            cold_start: ColdStart::from_notify_flag(config.notify_on_cold_start),
            write_snapshot_on_fetch_failure: config.write_snapshot_on_fetch_failure,
            lease: (config.lease_seconds > 0).then(|| Duration::from_secs(config.lease_seconds)),
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self::from_config(&WatchConfig::default())
    }
}

/// Runs the fetch, diff and notify sequence against its collaborators
pub struct Watcher {
    source_url: String,
    extractor: Extractor,
    settings: WatchSettings,
    fetcher: Box<dyn Fetcher>,
    store: Box<dyn SnapshotStore>,
    notifier: Box<dyn Notifier>,
    config_hash: Option<String>,
}

impl Watcher {
    pub fn new(
        source_url: impl Into<String>,
        extractor: Extractor,
        settings: WatchSettings,
        fetcher: Box<dyn Fetcher>,
        store: Box<dyn SnapshotStore>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            extractor,
            settings,
            fetcher,
            store,
            notifier,
            config_hash: None,
        }
    }

    /// Creates a watcher wired with the collaborators named in `config`
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `config_hash` - Hash of the configuration file, stored in the run log
    ///
    /// # Returns
    ///
    /// * `Ok(Watcher)` - Ready to run
    /// * `Err(WatchError)` - A collaborator could not be built
    pub fn from_config(config: &Config, config_hash: Option<String>) -> Result<Self, WatchError> {
        let client = build_http_client(&config.user_agent)?;
        let extractor = Extractor::from_config(&config.source)?;
        let store = open_store(&config.store)?;
        let notifier = build_notifier(&config.notify, client.clone())?;

        tracing::debug!(
            "Watcher for {} using {} store and {} notifier",
            config.source.url,
            config.store.path(),
            config.notify.transport.name()
        );

        let watcher = Self::new(
            config.source.url.clone(),
            extractor,
            WatchSettings::from_config(&config.watch),
            Box::new(HttpFetcher::new(client)),
            store,
            notifier,
        );

        Ok(Self {
            config_hash,
            ..watcher
        })
    }

    pub fn store(&self) -> &dyn SnapshotStore {
        self.store.as_ref()
    }

    /// Performs one complete run
    ///
    /// Never fails: every collaborator error is logged and recorded in the
    /// returned report.
    pub async fn run_once(&self) -> RunReport {
        let mut report = RunReport::started(Utc::now());
        let holder = format!("{}-{}", std::process::id(), report.started_at.timestamp_millis());

        let leased = match self.settings.lease {
            Some(ttl) => match self.store.acquire_lease(&holder, ttl).await {
                Ok(true) => true,
                Ok(false) => {
                    tracing::info!("Another run holds the lease, skipping");
                    report.status = RunStatus::Skipped;
                    report.message = MESSAGE_SKIPPED.to_string();
                    report.finished_at = Utc::now();
                    self.record(&report).await;
                    return report;
                }
                Err(e) => {
                    tracing::warn!("Failed to acquire lease, running without it: {}", e);
                    false
                }
            },
            None => false,
        };

        self.execute(&mut report).await;
        report.finished_at = Utc::now();
        self.record(&report).await;

        if leased {
            if let Err(e) = self.store.release_lease(&holder).await {
                tracing::warn!("Failed to release lease: {}", e);
            }
        }

        report
    }

    async fn execute(&self, report: &mut RunReport) {
        tracing::info!("Fetching {}", self.source_url);
        let current = match self.fetcher.fetch(&self.source_url).await {
            Ok(html) => self.extractor.extract(&html),
            Err(e) => {
                tracing::warn!("Fetch failed, continuing with no records: {}", e);
                report.fetch_error = Some(e.to_string());
                Vec::new()
            }
        };
        tracing::info!("Extracted {} records", current.len());

        let previous = match self.store.load().await {
            Ok(previous) => previous,
            Err(e) => {
                tracing::warn!("Failed to load previous snapshot, treating as absent: {}", e);
                None
            }
        };
        if previous.is_none() {
            tracing::info!("No previous snapshot ({:?})", self.settings.cold_start);
        }

        let relevant = compute_relevant_new(
            &current,
            previous.as_deref(),
            &self.settings.target_sizes,
            self.settings.cold_start,
        );
        tracing::info!(
            "{} current records, {} relevant new entries",
            current.len(),
            relevant.len()
        );

        if !relevant.is_empty() {
            match self.notifier.notify(&relevant).await {
                Ok(()) => report.email_sent = true,
                Err(e) => {
                    tracing::error!("Failed to send notification: {}", e);
                    report.notify_error = Some(e.to_string());
                }
            }
        }

        if report.fetch_error.is_some() && !self.settings.write_snapshot_on_fetch_failure {
            tracing::info!("Keeping previous snapshot because the fetch failed");
        } else if let Err(e) = self.store.save(&current).await {
            tracing::error!("Failed to save snapshot: {}", e);
            report.store_error = Some(e.to_string());
            report.status = RunStatus::PartialFailure;
            report.message = MESSAGE_SAVE_FAILED.to_string();
        } else {
            tracing::debug!("Saved snapshot with {} records", current.len());
        }

        report.current_count = current.len();
        report.new_count = relevant.len();
        report.relevant = relevant;
        report.data = current;
    }

    async fn record(&self, report: &RunReport) {
        let entry = report.to_log_entry(self.config_hash.as_deref());
        if let Err(e) = self.store.record_run(&entry).await {
            tracing::warn!("Failed to record run: {}", e);
        }
    }
}
