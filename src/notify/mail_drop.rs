//! Mail pickup directory transport
//!
//! Writes each notification as a complete RFC 5322 message into a directory.
//! A local MTA (or any pickup agent) is expected to send and remove the files.

use crate::listing::ListingRecord;
use crate::notify::render::{render_notification, Notification};
use crate::notify::traits::{Notifier, NotifyResult};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use std::path::{Path, PathBuf};

const BOUNDARY: &str = "licitace-watch-alternative";

/// Raw bytes per RFC 2047 encoded word, keeps each word under 75 characters
const ENCODED_WORD_BYTES: usize = 45;

/// Notifier that drops `.eml` files into a pickup directory
#[derive(Debug, Clone)]
pub struct MailDropNotifier {
    directory: PathBuf,
    from: String,
    to: Vec<String>,
    subject: String,
}

impl MailDropNotifier {
    pub fn new(
        directory: impl Into<PathBuf>,
        from: impl Into<String>,
        to: Vec<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            directory: directory.into(),
            from: from.into(),
            to,
            subject: subject.into(),
        }
    }

    /// Builds the full message text including headers
    pub fn compose(&self, notification: &Notification) -> String {
        let mut message = String::new();

        message.push_str(&format!("From: {}\r\n", single_line(&self.from)));
        message.push_str(&format!("To: {}\r\n", single_line(&self.to.join(", "))));
        message.push_str(&format!(
            "Subject: {}\r\n",
            encode_header_text(&single_line(&notification.subject))
        ));
        message.push_str(&format!("Date: {}\r\n", Utc::now().to_rfc2822()));
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str(&format!(
            "Content-Type: multipart/alternative; boundary=\"{}\"\r\n\r\n",
            BOUNDARY
        ));

        for (content_type, body) in [
            ("text/plain", &notification.text),
            ("text/html", &notification.html),
        ] {
            message.push_str(&format!("--{}\r\n", BOUNDARY));
            message.push_str(&format!(
                "Content-Type: {}; charset=utf-8\r\n",
                content_type
            ));
            message.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
            message.push_str(&body.replace('\n', "\r\n"));
            message.push_str("\r\n");
        }

        message.push_str(&format!("--{}--\r\n", BOUNDARY));
        message
    }
}

/// Replaces line breaks and other control characters with spaces
fn single_line(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Encodes non-ASCII header text as RFC 2047 base64 encoded words
///
/// ASCII text is returned unchanged. Longer text is split on character
/// boundaries into several words joined by folding whitespace.
fn encode_header_text(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in text.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_WORD_BYTES {
            words.push(format!("=?utf-8?B?{}?=", STANDARD.encode(chunk.as_bytes())));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(format!("=?utf-8?B?{}?=", STANDARD.encode(chunk.as_bytes())));
    }

    words.join("\r\n ")
}

#[async_trait]
impl Notifier for MailDropNotifier {
    async fn notify(&self, entries: &[ListingRecord]) -> NotifyResult<()> {
        let notification = render_notification(entries, &self.subject);
        let message = self.compose(&notification);

        tokio::fs::create_dir_all(&self.directory).await?;

        let stem = format!(
            "{}-{}",
            Utc::now().format("%Y%m%dT%H%M%S%.6fZ"),
            std::process::id()
        );
        let tmp_path = self.directory.join(format!(".{}.tmp", stem));
        let path = self.directory.join(format!("{}.eml", stem));

        // Pickup agents must never see a half-written file
        tokio::fs::write(&tmp_path, message).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        tracing::info!(
            "Dropped notification for {} entries into {}",
            entries.len(),
            path.display()
        );
        Ok(())
    }
}
