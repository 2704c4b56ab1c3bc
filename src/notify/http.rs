use crate::listing::ListingRecord;
use crate::notify::render::render_notification;
use crate::notify::traits::{Notifier, NotifyError, NotifyResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

/// Body accepted by the transactional mail API
#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

/// Notifier that POSTs the message to a transactional mail HTTP API
///
/// The request carries a bearer token and a JSON body with `from`, `to`,
/// `subject`, `text` and `html`. Any non-2xx answer counts as a rejection.
pub struct HttpMailNotifier {
    client: Client,
    endpoint: String,
    api_key: String,
    from: String,
    to: Vec<String>,
    subject: String,
}

impl HttpMailNotifier {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        to: Vec<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            from: from.into(),
            to,
            subject: subject.into(),
        }
    }

    /// Reads the API key from the environment variable `api_key_env`
    pub fn api_key_from_env(api_key_env: &str) -> NotifyResult<String> {
        std::env::var(api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| NotifyError::MissingCredential(api_key_env.to_string()))
    }
}

#[async_trait]
impl Notifier for HttpMailNotifier {
    async fn notify(&self, entries: &[ListingRecord]) -> NotifyResult<()> {
        let notification = render_notification(entries, &self.subject);
        let request = MailRequest {
            from: &self.from,
            to: &self.to,
            subject: &notification.subject,
            text: &notification.text,
            html: &notification.html,
        };

        tracing::info!(
            "Sending notification for {} entries to {}",
            entries.len(),
            self.to.join(", ")
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Mail API answered {}: {}", status, body);
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key() {
        let result = HttpMailNotifier::api_key_from_env("LICITACE_WATCH_TEST_UNSET_KEY");
        assert!(matches!(
            result,
            Err(NotifyError::MissingCredential(name)) if name == "LICITACE_WATCH_TEST_UNSET_KEY"
        ));
    }

    #[test]
    fn test_request_shape() {
        let to = vec!["a@example.com".to_string()];
        let request = MailRequest {
            from: "watch@example.com",
            to: &to,
            subject: "New",
            text: "t",
            html: "<p>h</p>",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["to"][0], "a@example.com");
        assert_eq!(json["html"], "<p>h</p>");
    }
}
