use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

use super::schema::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid value {value:?} in environment variable {name}: expected {expected}")]
    Environment {
        name: String,
        value: String,
        expected: &'static str,
    },
    #[error("invalid config: {0}")]
    Validation(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let monitor = &self.monitor;
        if monitor.service_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "monitor.service_name must not be empty".to_string(),
            ));
        }
        if monitor.service_name.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(
                "monitor.service_name must not contain whitespace".to_string(),
            ));
        }
        if monitor.check_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "monitor.check_interval_secs must be greater than 0".to_string(),
            ));
        }
        if monitor.probe_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "monitor.probe_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if monitor.state_file.trim().is_empty() {
            return Err(ConfigError::Validation(
                "monitor.state_file must not be empty".to_string(),
            ));
        }

        let notify = &self.notify;
        if notify.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "notify.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if notify.retry_attempts == 0 {
            return Err(ConfigError::Validation(
                "notify.retry_attempts must be at least 1".to_string(),
            ));
        }

        if notify.email.enabled {
            if notify.email.sendmail_path.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "notify.email.sendmail_path must not be empty when notify.email.enabled is true"
                        .to_string(),
                ));
            }
            if notify.email.to.is_empty() {
                return Err(ConfigError::Validation(
                    "notify.email.to must list at least one recipient when notify.email.enabled is true"
                        .to_string(),
                ));
            }
            validate_email("notify.email.from", &notify.email.from)?;
            for recipient in &notify.email.to {
                validate_email("notify.email.to", recipient)?;
            }
        }

        if notify.webhook.enabled {
            let url = notify.webhook.url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Validation(
                    "notify.webhook.url must be an http(s) URL when notify.webhook.enabled is true"
                        .to_string(),
                ));
            }
            if notify.webhook.timeout_secs == 0 {
                return Err(ConfigError::Validation(
                    "notify.webhook.timeout_secs must be greater than 0".to_string(),
                ));
            }
        }

        if !valid_log_level(&self.logging.level) {
            return Err(ConfigError::Validation(format!(
                "logging.level '{}' is not a valid log filter",
                self.logging.level
            )));
        }
        if !self.logging.file.trim().is_empty() {
            if self.logging.file_max_bytes == 0 {
                return Err(ConfigError::Validation(
                    "logging.file_max_bytes must be greater than 0".to_string(),
                ));
            }
            if self.logging.file_keep == 0 {
                return Err(ConfigError::Validation(
                    "logging.file_keep must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// A bare word would otherwise parse as a target filter and silence everything.
fn valid_log_level(level: &str) -> bool {
    let level = level.trim();
    if level.is_empty() {
        return false;
    }
    if level.contains('=') || level.contains(',') {
        return EnvFilter::try_new(level).is_ok();
    }
    level.parse::<LevelFilter>().is_ok()
}

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").ok())
        .as_ref()
}

fn validate_email(field: &str, value: &str) -> Result<(), ConfigError> {
    let valid = email_pattern().is_some_and(|pattern| pattern.is_match(value.trim()));
    if !valid {
        return Err(ConfigError::Validation(format!(
            "{} contains an invalid email address: {}",
            field, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, validate_email};
    use crate::config::Config;

    fn rejects(config: &Config, needle: &str) {
        match config.validate() {
            Err(ConfigError::Validation(message)) => {
                assert!(message.contains(needle), "unexpected message: {}", message)
            }
            other => panic!("expected validation error containing {}, got {:?}", needle, other),
        }
    }

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().expect("defaults validate");
    }

    #[test]
    fn zero_cooldown_is_allowed() {
        let mut config = Config::default();
        config.monitor.alert_cooldown_secs = 0;
        config.validate().expect("cooldown 0 is legal");
    }

    #[test]
    fn monitor_fields_are_checked() {
        let mut config = Config::default();
        config.monitor.service_name = " ".to_string();
        rejects(&config, "service_name must not be empty");

        config.monitor.service_name = "squid proxy".to_string();
        rejects(&config, "must not contain whitespace");

        config = Config::default();
        config.monitor.check_interval_secs = 0;
        rejects(&config, "check_interval_secs");

        config = Config::default();
        config.monitor.probe_timeout_secs = 0;
        rejects(&config, "probe_timeout_secs");

        config = Config::default();
        config.monitor.state_file = String::new();
        rejects(&config, "state_file");
    }

    #[test]
    fn notify_fields_are_checked() {
        let mut config = Config::default();
        config.notify.retry_attempts = 0;
        rejects(&config, "retry_attempts");

        config = Config::default();
        config.notify.timeout_secs = 0;
        rejects(&config, "notify.timeout_secs");

        config = Config::default();
        config.notify.webhook.enabled = true;
        config.notify.webhook.url = "ftp://example.com/hook".to_string();
        rejects(&config, "http(s) URL");
    }

    #[test]
    fn email_addresses_are_checked_only_when_enabled() {
        let mut config = Config::default();
        config.notify.email.to = vec!["not-an-address".to_string()];
        config.validate().expect("disabled email is not checked");

        config.notify.email.enabled = true;
        rejects(&config, "invalid email address: not-an-address");

        config.notify.email.to = Vec::new();
        rejects(&config, "at least one recipient");
    }

    #[test]
    fn email_pattern_accepts_common_forms() {
        assert!(validate_email("to", "ops.team+alerts@mail.example.org").is_ok());
        assert!(validate_email("to", "root@localhost").is_err());
        assert!(validate_email("to", "a b@example.com").is_err());
    }

    #[test]
    fn log_level_must_parse() {
        let mut config = Config::default();
        config.logging.level = "svcwatch=debug,info".to_string();
        config.validate().expect("directive list is accepted");

        config.logging.level = "loud".to_string();
        rejects(&config, "logging.level");

        config.logging.level = String::new();
        rejects(&config, "logging.level");
    }

    #[test]
    fn log_file_rotation_limits_are_checked() {
        let mut config = Config::default();
        config.logging.file_max_bytes = 0;
        config.validate().expect("limits are ignored without a log file");

        config.logging.file = "/var/log/svcwatch/svcwatch.log".to_string();
        rejects(&config, "file_max_bytes");

        config.logging.file_max_bytes = 1024;
        config.logging.file_keep = 0;
        rejects(&config, "file_keep");
    }
}
