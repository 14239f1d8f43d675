use std::time::Duration;

use super::error::NotifyError;
use super::payload::AlertPayload;

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("svcwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(NotifyError::WebhookClient)?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub async fn send(&self, payload: &AlertPayload) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(payload).send().await?;

        if !response.status().is_success() {
            return Err(NotifyError::WebhookStatus(response.status()));
        }

        tracing::debug!(
            url = %self.url,
            service = %payload.service,
            kind = ?payload.kind,
            "webhook_sent"
        );
        Ok(())
    }
}
