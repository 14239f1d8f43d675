use thiserror::Error;

use crate::system::CommandError;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("sendmail could not be run: {0}")]
    Sendmail(#[from] CommandError),
    #[error("sendmail exited with status {status}: {stderr}")]
    SendmailStatus { status: i32, stderr: String },
    #[error("webhook client could not be built: {0}")]
    WebhookClient(reqwest::Error),
    #[error("webhook request failed: {0}")]
    Webhook(#[from] reqwest::Error),
    #[error("webhook returned status {0}")]
    WebhookStatus(reqwest::StatusCode),
    #[error("{channel} delivery failed after {attempts} attempt(s): {source}")]
    Exhausted {
        channel: &'static str,
        attempts: u32,
        source: Box<NotifyError>,
    },
    #[error("{} notification channel(s) failed: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<NotifyError>),
}

fn join_errors(errors: &[NotifyError]) -> String {
    errors
        .iter()
        .map(|error| error.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
