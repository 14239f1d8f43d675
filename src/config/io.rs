use std::path::Path;

use toml::{Table, Value};

use super::env::{env_table, merge_tables, process_env};
use super::{schema::Config, validate::ConfigError};

/// Builds the validated configuration. Keys come from the file when given,
/// then from the process environment, then from built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let Some(path) = path else {
        return build_config(Table::new(), "<defaults>", process_env);
    };

    let path_str = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_str.clone(),
        source,
    })?;
    parse_config(&raw, &path_str, process_env)
}

fn parse_config(
    raw: &str,
    path: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let file: Table = toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })?;
    build_config(file, path, env)
}

fn build_config(
    file: Table,
    path: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let mut merged = env_table(env)?;
    merge_tables(&mut merged, file);

    let config: Config = Value::Table(merged)
        .try_into()
        .map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{load_config, parse_config};
    use crate::config::ConfigError;

    fn no_env(_name: &str) -> Option<String> {
        None
    }

    fn env<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("", "inline", no_env).expect("empty config");
        assert_eq!(config.monitor.service_name, "squid");
        assert_eq!(config.monitor.check_interval_secs, 300);
        assert_eq!(config.monitor.alert_cooldown_secs, 3600);
        assert_eq!(config.monitor.state_file, "/var/lib/svcwatch/state.json");
        assert_eq!(config.monitor.unknown_escalation_after, 0);
        assert_eq!(config.notify.retry_attempts, 3);
        assert!(!config.notify.email.enabled);
        assert_eq!(config.notify.email.to, vec!["admin@example.com".to_string()]);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.json);
    }

    #[test]
    fn full_file_is_parsed() {
        let raw = r#"
[monitor]
service_name = "nginx"
check_interval_secs = 60
alert_cooldown_secs = 0
state_file = "/tmp/svcwatch/state.json"
probe_timeout_secs = 5
unknown_escalation_after = 3
dry_run = true

[notify]
timeout_secs = 20
retry_attempts = 2
retry_delay_secs = 1
include_metrics = false
log_lines = 10

[notify.email]
enabled = true
sendmail_path = "/usr/lib/sendmail"
from = "monitor@example.com"
to = ["ops@example.com", "oncall@example.com"]

[notify.webhook]
enabled = true
url = "https://hooks.example.com/svcwatch"
timeout_secs = 15

[logging]
level = "debug"
json = false
"#;
        let config = parse_config(raw, "inline", no_env).expect("full config");
        assert_eq!(config.monitor.service_name, "nginx");
        assert_eq!(config.monitor.alert_cooldown_secs, 0);
        assert_eq!(config.monitor.unknown_escalation_after, 3);
        assert!(config.monitor.dry_run);
        assert!(!config.notify.include_metrics);
        assert_eq!(config.notify.email.to.len(), 2);
        assert_eq!(config.notify.webhook.timeout_secs, 15);
        assert!(!config.logging.json);
    }

    #[test]
    fn negative_interval_is_a_parse_error() {
        let result = parse_config("[monitor]\ncheck_interval_secs = -5\n", "inline", no_env);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn zero_interval_fails_validation() {
        let result = parse_config("[monitor]\ncheck_interval_secs = 0\n", "inline", no_env);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempdir().expect("temp dir");
        let result = load_config(Some(dir.path().join("absent.toml").as_path()));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn file_on_disk_is_loaded() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("svcwatch.toml");
        fs::write(&path, "[monitor]\nservice_name = \"sshd\"\n").expect("write config");

        let config = load_config(Some(path.as_path())).expect("load config");
        assert_eq!(config.monitor.service_name, "sshd");
    }

    #[test]
    fn delivery_budget_covers_retries() {
        let mut config = parse_config("", "inline", no_env).expect("defaults").notify;
        assert_eq!(config.delivery_budget_secs(), 120);

        config.email.enabled = true;
        config.retry_attempts = 3;
        config.retry_delay_secs = 5;
        // three 120s attempts plus 5s and 10s of backoff
        assert_eq!(config.delivery_budget_secs(), 375);
    }

    #[test]
    fn environment_fills_keys_the_file_leaves_out() {
        let vars = [
            ("SERVICE_NAME", "nginx"),
            ("CHECK_INTERVAL", "60"),
            ("ALERT_COOLDOWN", "900"),
            ("STATE_FILE", "/tmp/svcwatch/state.json"),
            ("DRY_RUN", "true"),
            ("RETRY_ATTEMPTS", "5"),
            ("RETRY_DELAY", "2"),
            ("WEBHOOK_URL", "https://hooks.example.com/env"),
            ("LOG_LEVEL", "DEBUG"),
        ];
        let config = parse_config("", "inline", env(&vars)).expect("env config");

        assert_eq!(config.monitor.service_name, "nginx");
        assert_eq!(config.monitor.check_interval_secs, 60);
        assert_eq!(config.monitor.alert_cooldown_secs, 900);
        assert_eq!(config.monitor.state_file, "/tmp/svcwatch/state.json");
        assert!(config.monitor.dry_run);
        assert_eq!(config.notify.retry_attempts, 5);
        assert_eq!(config.notify.retry_delay_secs, 2);
        assert_eq!(config.notify.webhook.url, "https://hooks.example.com/env");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn file_keys_win_over_the_environment() {
        let vars = [("SERVICE_NAME", "nginx"), ("CHECK_INTERVAL", "60")];
        let config = parse_config(
            "[monitor]\nservice_name = \"sshd\"\n",
            "inline",
            env(&vars),
        )
        .expect("merged config");

        assert_eq!(config.monitor.service_name, "sshd");
        assert_eq!(config.monitor.check_interval_secs, 60);
    }

    #[test]
    fn environment_values_are_validated() {
        let result = parse_config("", "inline", env(&[("CHECK_INTERVAL", "0")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));

        let result = parse_config("", "inline", env(&[("CHECK_INTERVAL", "soon")]));
        assert!(matches!(result, Err(ConfigError::Environment { .. })));
    }

    #[test]
    fn smtp_recipients_are_split_on_commas() {
        let vars = [("SMTP_TO", "ops@example.com,oncall@example.com")];
        let config = parse_config(
            "[notify.email]\nenabled = true\n",
            "inline",
            env(&vars),
        )
        .expect("email config");

        assert_eq!(
            config.notify.email.to,
            vec!["ops@example.com".to_string(), "oncall@example.com".to_string()]
        );
    }
}
