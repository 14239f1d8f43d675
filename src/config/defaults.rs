use super::schema::{EmailConfig, LoggingConfig, MonitorConfig, NotifyConfig, WebhookConfig};

pub(super) fn default_service_name() -> String {
    "squid".to_string()
}

pub(super) fn default_check_interval_secs() -> u64 {
    300
}

pub(super) fn default_alert_cooldown_secs() -> u64 {
    3600
}

pub(super) fn default_state_file() -> String {
    "/var/lib/svcwatch/state.json".to_string()
}

pub(super) fn default_probe_timeout_secs() -> u64 {
    10
}

pub(super) fn default_notify_timeout_secs() -> u64 {
    120
}

pub(super) fn default_retry_attempts() -> u32 {
    3
}

pub(super) fn default_retry_delay_secs() -> u64 {
    5
}

pub(super) fn default_include_metrics() -> bool {
    true
}

pub(super) fn default_log_lines() -> u32 {
    50
}

pub(super) fn default_sendmail_path() -> String {
    "/usr/sbin/sendmail".to_string()
}

pub(super) fn default_email_from() -> String {
    "svcwatch-noreply@example.com".to_string()
}

pub(super) fn default_email_to() -> Vec<String> {
    vec!["admin@example.com".to_string()]
}

pub(super) fn default_webhook_timeout_secs() -> u64 {
    30
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_log_json() -> bool {
    true
}

pub(super) fn default_log_file_max_bytes() -> u64 {
    10 * 1024 * 1024
}

pub(super) fn default_log_file_keep() -> u32 {
    5
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            check_interval_secs: default_check_interval_secs(),
            alert_cooldown_secs: default_alert_cooldown_secs(),
            state_file: default_state_file(),
            probe_timeout_secs: default_probe_timeout_secs(),
            unknown_escalation_after: 0,
            dry_run: false,
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_notify_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            include_metrics: default_include_metrics(),
            log_lines: default_log_lines(),
            email: EmailConfig::default(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sendmail_path: default_sendmail_path(),
            from: default_email_from(),
            to: default_email_to(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_log_json(),
            file: String::new(),
            file_max_bytes: default_log_file_max_bytes(),
            file_keep: default_log_file_keep(),
        }
    }
}
