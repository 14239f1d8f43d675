mod email;
mod error;
mod payload;
mod render;
mod webhook;

use std::time::Duration;

use tokio::time::sleep;

use crate::config::NotifyConfig;

pub use email::SendmailNotifier;
pub use error::NotifyError;
pub use payload::AlertPayload;
#[cfg(test)]
pub use payload::AlertKind;
pub use render::{RenderedAlert, render_alert};
pub use webhook::WebhookNotifier;

/// Delivers one alert. Callers may retry a failed call, so implementations
/// must tolerate repeated delivery of the same payload.
pub trait Notifier {
    async fn notify(&self, payload: &AlertPayload) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub enum Channel {
    Email(SendmailNotifier),
    Webhook(WebhookNotifier),
}

impl Channel {
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Email(_) => "email",
            Channel::Webhook(_) => "webhook",
        }
    }

    async fn deliver(
        &self,
        payload: &AlertPayload,
        rendered: &RenderedAlert,
    ) -> Result<(), NotifyError> {
        match self {
            Channel::Email(notifier) => notifier.send(payload, rendered).await,
            Channel::Webhook(notifier) => notifier.send(payload).await,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

#[derive(Debug, Clone)]
pub enum ActiveNotifier {
    /// Renders and logs the alert for every configured channel without
    /// sending anything.
    DryRun { channels: Vec<Channel> },
    Deliver {
        channels: Vec<Channel>,
        retry: RetryPolicy,
    },
}

impl ActiveNotifier {
    pub fn from_config(config: &NotifyConfig, dry_run: bool) -> Result<Self, NotifyError> {
        let mut channels = Vec::new();

        if config.email.enabled {
            channels.push(Channel::Email(SendmailNotifier::new(
                &config.email.sendmail_path,
                &config.email.from,
                &config.email.to,
                config.timeout_secs,
            )));
        }

        if config.webhook.enabled {
            channels.push(Channel::Webhook(WebhookNotifier::new(
                &config.webhook.url,
                config.webhook.timeout_secs,
            )?));
        }

        if dry_run {
            return Ok(Self::DryRun { channels });
        }

        Ok(Self::Deliver {
            channels,
            retry: RetryPolicy {
                attempts: config.retry_attempts.max(1),
                base_delay: Duration::from_secs(config.retry_delay_secs),
            },
        })
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        let (ActiveNotifier::DryRun { channels } | ActiveNotifier::Deliver { channels, .. }) =
            self;
        channels.iter().map(Channel::name).collect()
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, ActiveNotifier::DryRun { .. })
    }
}

impl Notifier for ActiveNotifier {
    async fn notify(&self, payload: &AlertPayload) -> Result<(), NotifyError> {
        let rendered = render_alert(payload);

        match self {
            ActiveNotifier::DryRun { channels } => {
                log::info!(
                    "dry_run_notification service={} kind={:?} channels={:?} subject={:?}",
                    payload.service,
                    payload.kind,
                    self.channel_names(),
                    rendered.subject
                );
                tracing::debug!(
                    channel_count = channels.len(),
                    body = %rendered.text,
                    "dry_run_notification_body"
                );
                Ok(())
            }
            ActiveNotifier::Deliver { channels, retry } => {
                if channels.is_empty() {
                    log::warn!(
                        "notification_skipped service={} kind={:?} reason=no_channels_enabled",
                        payload.service,
                        payload.kind
                    );
                    return Ok(());
                }

                let mut errors = Vec::new();
                for channel in channels {
                    if let Err(error) = deliver_with_retry(channel, payload, &rendered, retry).await
                    {
                        errors.push(error);
                    }
                }

                if errors.is_empty() {
                    Ok(())
                } else {
                    Err(NotifyError::Multiple(errors))
                }
            }
        }
    }
}

async fn deliver_with_retry(
    channel: &Channel,
    payload: &AlertPayload,
    rendered: &RenderedAlert,
    retry: &RetryPolicy,
) -> Result<(), NotifyError> {
    let mut attempt = 1;
    loop {
        match channel.deliver(payload, rendered).await {
            Ok(()) => return Ok(()),
            Err(error) if attempt >= retry.attempts => {
                return Err(NotifyError::Exhausted {
                    channel: channel.name(),
                    attempts: attempt,
                    source: Box::new(error),
                });
            }
            Err(error) => {
                let delay = retry.delay_before(attempt);
                log::warn!(
                    "notification_attempt_failed channel={} attempt={} retry_in_secs={} error={}",
                    channel.name(),
                    attempt,
                    delay.as_secs(),
                    error
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::DateTime;

    use super::{ActiveNotifier, Channel, Notifier, NotifyError, RetryPolicy, SendmailNotifier};
    use crate::config::NotifyConfig;
    use crate::monitor::ServiceStatus;
    use crate::notify::payload::{AlertKind, AlertPayload};

    fn payload() -> AlertPayload {
        AlertPayload {
            kind: AlertKind::Failure,
            service: "squid".to_string(),
            hostname: "proxy-01".to_string(),
            status: ServiceStatus::Down,
            is_active: false,
            detail: None,
            observed_at: DateTime::from_timestamp(0, 0).expect("valid timestamp"),
            consecutive_failures: 1,
            repeat: false,
            metrics: None,
            recent_logs: None,
            cycle_id: 1,
        }
    }

    fn broken_email() -> Channel {
        Channel::Email(SendmailNotifier::new(
            "svcwatch-missing-sendmail",
            "monitor@example.com",
            &["ops@example.com".to_string()],
            1,
        ))
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let retry = RetryPolicy {
            attempts: 4,
            base_delay: Duration::from_secs(5),
        };
        assert_eq!(retry.delay_before(1), Duration::from_secs(5));
        assert_eq!(retry.delay_before(2), Duration::from_secs(10));
        assert_eq!(retry.delay_before(3), Duration::from_secs(20));
    }

    #[test]
    fn config_selects_enabled_channels() {
        let mut config = NotifyConfig::default();
        config.email.enabled = true;
        config.webhook.enabled = true;
        config.webhook.url = "http://127.0.0.1:9/hook".to_string();

        let notifier = ActiveNotifier::from_config(&config, false).expect("notifier");
        assert_eq!(notifier.channel_names(), vec!["email", "webhook"]);
        assert!(!notifier.is_dry_run());

        let dry_run = ActiveNotifier::from_config(&config, true).expect("notifier");
        assert!(dry_run.is_dry_run());
        assert_eq!(dry_run.channel_names(), vec!["email", "webhook"]);
    }

    #[tokio::test]
    async fn dry_run_never_touches_channels() {
        let notifier = ActiveNotifier::DryRun {
            channels: vec![broken_email()],
        };
        notifier.notify(&payload()).await.expect("dry run succeeds");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_channel_is_retried_then_reported() {
        let notifier = ActiveNotifier::Deliver {
            channels: vec![broken_email()],
            retry: RetryPolicy {
                attempts: 3,
                base_delay: Duration::from_secs(5),
            },
        };

        let result = notifier.notify(&payload()).await;
        let Err(NotifyError::Multiple(errors)) = result else {
            panic!("expected aggregated failure, got {:?}", result);
        };
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            NotifyError::Exhausted {
                channel: "email",
                attempts: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn no_channels_is_not_an_error() {
        let notifier = ActiveNotifier::from_config(&NotifyConfig::default(), false)
            .expect("notifier");
        notifier.notify(&payload()).await.expect("nothing to send");
    }
}
