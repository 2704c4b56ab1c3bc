use crate::listing::TargetSizes;
use serde::Deserialize;

/// Default block elements that make up one text unit of the listing page
pub const DEFAULT_UNIT_SELECTOR: &str = "p, li, td, h1, h2, h3, h4, h5, h6";

/// Longest accepted run lease, one day
pub const MAX_LEASE_SECONDS: u64 = 86_400;

/// Default subject of the notification message
pub const DEFAULT_SUBJECT: &str = "New Property Listing Detected!";

/// Main configuration structure for Licitace-Watch
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub source: SourceConfig,
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// The listing page being watched
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourceConfig {
    /// URL of the listing page
    pub url: String,

    /// Base for resolving relative detail links, defaults to `url`
    #[serde(default)]
    pub base_url: Option<String>,

    /// CSS selector for the blocks scanned one by one
    #[serde(default = "default_unit_selector")]
    pub unit_selector: String,

    /// Only emit records once a detail link has been seen
    #[serde(default = "default_true")]
    pub require_link: bool,
}

impl SourceConfig {
    /// Returns the URL relative links are resolved against
    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(&self.url)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the watcher
    pub crawler_name: String,

    /// Version of the watcher
    pub crawler_version: String,

    /// URL with information about the watcher
    pub contact_url: String,

    /// Email address for contact by the site operator
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: Name/Version (+ContactURL; ContactEmail)
    pub fn user_agent_string(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Change-detection behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WatchConfig {
    /// Flat sizes that trigger a notification
    #[serde(default)]
    pub target_sizes: TargetSizes,

    /// Notify about everything when no snapshot exists yet
    #[serde(default)]
    pub notify_on_cold_start: bool,

    /// Overwrite the snapshot with an empty set when the fetch failed
    #[serde(default)]
    pub write_snapshot_on_fetch_failure: bool,

    /// Lifetime of the single-run lease in seconds, 0 disables it
    #[serde(default = "default_lease_seconds")]
    pub lease_seconds: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            target_sizes: TargetSizes::default(),
            notify_on_cold_start: false,
            write_snapshot_on_fetch_failure: false,
            lease_seconds: default_lease_seconds(),
        }
    }
}

/// Snapshot storage backend
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StoreConfig {
    /// Single pretty-printed JSON document
    JsonFile { path: String },

    /// SQLite database with snapshot history and a run log
    Sqlite {
        path: String,
        #[serde(default = "default_history")]
        history: u32,
    },
}

impl StoreConfig {
    pub fn path(&self) -> &str {
        match self {
            Self::JsonFile { path } | Self::Sqlite { path, .. } => path.as_str(),
        }
    }
}

/// Notification settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NotifyConfig {
    #[serde(flatten)]
    pub transport: NotifyTransport,

    /// Sender address
    #[serde(default)]
    pub from: String,

    /// Recipient addresses
    #[serde(default)]
    pub to: Vec<String>,

    #[serde(default = "default_subject")]
    pub subject: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            transport: NotifyTransport::Log,
            from: String::new(),
            to: Vec::new(),
            subject: default_subject(),
        }
    }
}

/// How a notification leaves the process
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NotifyTransport {
    /// Write the entries to the log only
    Log,

    /// Drop an RFC 5322 message file into a pickup directory
    MailDrop { directory: String },

    /// POST the message to a transactional mail HTTP API
    Http {
        endpoint: String,
        #[serde(rename = "api-key-env")]
        api_key_env: String,
    },
}

impl NotifyTransport {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::MailDrop { .. } => "mail-drop",
            Self::Http { .. } => "http",
        }
    }
}

fn default_unit_selector() -> String {
    DEFAULT_UNIT_SELECTOR.to_string()
}

fn default_true() -> bool {
    true
}

fn default_lease_seconds() -> u64 {
    300
}

fn default_history() -> u32 {
    10
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}
