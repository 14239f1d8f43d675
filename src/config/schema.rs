use serde::Deserialize;

use super::defaults::*;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default = "default_alert_cooldown_secs")]
    pub alert_cooldown_secs: u64,
    #[serde(default = "default_state_file")]
    pub state_file: String,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Zero keeps unknown observations as pure no-ops.
    #[serde(default)]
    pub unknown_escalation_after: u32,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_include_metrics")]
    pub include_metrics: bool,
    #[serde(default = "default_log_lines")]
    pub log_lines: u32,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_sendmail_path")]
    pub sendmail_path: String,
    #[serde(default = "default_email_from", alias = "sender")]
    pub from: String,
    #[serde(default = "default_email_to", alias = "recipients")]
    pub to: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_json")]
    pub json: bool,
    /// Empty disables the rotating log file.
    #[serde(default)]
    pub file: String,
    #[serde(default = "default_log_file_max_bytes")]
    pub file_max_bytes: u64,
    #[serde(default = "default_log_file_keep")]
    pub file_keep: u32,
}

impl NotifyConfig {
    /// Worst-case time for one notification: every enabled channel used up
    /// all of its attempts and backoff delays.
    pub fn delivery_budget_secs(&self) -> u64 {
        let attempts = u64::from(self.retry_attempts.max(1));
        let backoff: u64 = (0..attempts.saturating_sub(1))
            .map(|step| self.retry_delay_secs.saturating_mul(1 << step.min(16)))
            .fold(0, u64::saturating_add);

        let mut per_channel = Vec::new();
        if self.email.enabled {
            per_channel.push(self.timeout_secs);
        }
        if self.webhook.enabled {
            per_channel.push(self.webhook.timeout_secs);
        }

        per_channel
            .into_iter()
            .map(|timeout| timeout.saturating_mul(attempts).saturating_add(backoff))
            .fold(0, u64::saturating_add)
            .max(self.timeout_secs)
    }
}
