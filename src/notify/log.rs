use crate::listing::ListingRecord;
use crate::notify::traits::{Notifier, NotifyResult};
use async_trait::async_trait;

/// Notifier that only writes the entries to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    subject: String,
}

impl LogNotifier {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, entries: &[ListingRecord]) -> NotifyResult<()> {
        tracing::info!("{} ({} entries)", self.subject, entries.len());
        for entry in entries {
            tracing::info!(
                size = %entry.size,
                date = %entry.date,
                link = entry.link.as_deref().unwrap_or("-"),
                "{}",
                entry.description
            );
        }
        Ok(())
    }
}
