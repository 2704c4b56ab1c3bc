//! Notifier trait and error types

use crate::listing::ListingRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while sending a notification
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Mail service rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),
}

/// Result type for notification operations
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Sends the relevant new entries somewhere a human will see them
///
/// The notifier owns message composition and transport. It is only called
/// with a non-empty slice.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, entries: &[ListingRecord]) -> NotifyResult<()>;
}
