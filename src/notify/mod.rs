//! Notification module
//!
//! This module handles:
//! - Rendering the new entries as a text and HTML table
//! - Delivering the message through the configured transport

mod http;
mod log;
mod mail_drop;
pub mod render;
mod traits;

pub use http::HttpMailNotifier;
pub use log::LogNotifier;
pub use mail_drop::MailDropNotifier;
pub use render::{render_notification, Notification};
pub use traits::{Notifier, NotifyError, NotifyResult};

use crate::config::{NotifyConfig, NotifyTransport};
use reqwest::Client;

/// Builds the notifier described by the configuration
///
/// # Arguments
///
/// * `config` - The `[notify]` configuration section
/// * `client` - HTTP client reused by the `http` transport
///
/// # Returns
///
/// * `Ok(Box<dyn Notifier>)` - Ready-to-use notifier
/// * `Err(NotifyError)` - The API key environment variable is not set
pub fn build_notifier(config: &NotifyConfig, client: Client) -> NotifyResult<Box<dyn Notifier>> {
    match &config.transport {
        NotifyTransport::Log => Ok(Box::new(LogNotifier::new(config.subject.clone()))),
        NotifyTransport::MailDrop { directory } => Ok(Box::new(MailDropNotifier::new(
            directory,
            config.from.clone(),
            config.to.clone(),
            config.subject.clone(),
        ))),
        NotifyTransport::Http {
            endpoint,
            api_key_env,
        } => {
            let api_key = HttpMailNotifier::api_key_from_env(api_key_env)?;
            Ok(Box::new(HttpMailNotifier::new(
                client,
                endpoint.clone(),
                api_key,
                config.from.clone(),
                config.to.clone(),
                config.subject.clone(),
            )))
        }
    }
}
