//! Configuration module for Licitace-Watch
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use licitace_watch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("watch.toml")).unwrap();
//! println!("Watching {} for {} sizes", config.source.url, config.watch.target_sizes.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, NotifyConfig, NotifyTransport, SourceConfig, StoreConfig, UserAgentConfig,
    WatchConfig, DEFAULT_SUBJECT, DEFAULT_UNIT_SELECTOR, MAX_LEASE_SECONDS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
