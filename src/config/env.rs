use toml::{Table, Value};

use super::validate::ConfigError;

#[derive(Debug, Clone, Copy)]
enum Kind {
    Text,
    Level,
    Seconds,
    Count,
    Flag,
    List,
}

impl Kind {
    fn expected(self) -> &'static str {
        match self {
            Kind::Text | Kind::Level => "text",
            Kind::Seconds => "a whole number of seconds",
            Kind::Count => "a non-negative integer",
            Kind::Flag => "true or false",
            Kind::List => "a comma-separated list",
        }
    }
}

/// Environment variables and the config keys they provide defaults for.
const BINDINGS: &[(&str, &[&str], Kind)] = &[
    ("SERVICE_NAME", &["monitor", "service_name"], Kind::Text),
    ("CHECK_INTERVAL", &["monitor", "check_interval_secs"], Kind::Seconds),
    ("STATE_FILE", &["monitor", "state_file"], Kind::Text),
    ("ALERT_COOLDOWN", &["monitor", "alert_cooldown_secs"], Kind::Seconds),
    ("DRY_RUN", &["monitor", "dry_run"], Kind::Flag),
    ("RETRY_ATTEMPTS", &["notify", "retry_attempts"], Kind::Count),
    ("RETRY_DELAY", &["notify", "retry_delay_secs"], Kind::Seconds),
    ("SMTP_TIMEOUT", &["notify", "timeout_secs"], Kind::Seconds),
    ("SMTP_FROM", &["notify", "email", "from"], Kind::Text),
    ("SMTP_TO", &["notify", "email", "to"], Kind::List),
    ("ENABLE_WEBHOOKS", &["notify", "webhook", "enabled"], Kind::Flag),
    ("WEBHOOK_URL", &["notify", "webhook", "url"], Kind::Text),
    ("LOG_LEVEL", &["logging", "level"], Kind::Level),
    ("LOG_FILE", &["logging", "file"], Kind::Text),
];

pub(super) fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Collects the bound variables that are set into a table shaped like the
/// config file, so the file can be merged on top of it.
pub(super) fn env_table(lookup: impl Fn(&str) -> Option<String>) -> Result<Table, ConfigError> {
    let mut table = Table::new();
    for (name, key_path, kind) in BINDINGS {
        let Some(raw) = lookup(*name) else {
            continue;
        };
        let value = typed_value(&raw, *kind).ok_or_else(|| ConfigError::Environment {
            name: (*name).to_string(),
            value: raw.clone(),
            expected: kind.expected(),
        })?;
        insert_path(&mut table, *key_path, value);
    }
    Ok(table)
}

fn typed_value(raw: &str, kind: Kind) -> Option<Value> {
    let trimmed = raw.trim();
    match kind {
        Kind::Text => Some(Value::String(raw.to_string())),
        Kind::Level => {
            let level = match trimmed.to_ascii_lowercase().as_str() {
                "warning" => "warn".to_string(),
                "critical" | "fatal" => "error".to_string(),
                other => other.to_string(),
            };
            Some(Value::String(level))
        }
        Kind::Seconds | Kind::Count => trimmed
            .parse::<u32>()
            .ok()
            .map(|number| Value::Integer(i64::from(number))),
        Kind::Flag => match trimmed.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(Value::Boolean(true)),
            "0" | "false" | "no" | "off" => Some(Value::Boolean(false)),
            _ => None,
        },
        Kind::List => Some(Value::Array(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        )),
    }
}

fn insert_path(table: &mut Table, key_path: &[&str], value: Value) {
    let Some((last, parents)) = key_path.split_last() else {
        return;
    };

    let mut current = table;
    for key in parents {
        let entry = current
            .entry((*key).to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        if !entry.is_table() {
            *entry = Value::Table(Table::new());
        }
        let Value::Table(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert((*last).to_string(), value);
}

/// Merges `overlay` into `base`; nested tables merge key by key and any
/// other overlay value replaces the base value.
pub(super) fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        let Value::Table(nested) = value else {
            base.insert(key, value);
            continue;
        };
        if let Some(Value::Table(existing)) = base.get_mut(&key) {
            merge_tables(existing, nested);
            continue;
        }
        base.insert(key, Value::Table(nested));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use toml::{Table, Value};

    use super::{env_table, merge_tables};
    use crate::config::ConfigError;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn unset_environment_adds_nothing() {
        let table = env_table(lookup(&[])).expect("empty environment");
        assert!(table.is_empty());
    }

    #[test]
    fn variables_land_on_their_config_keys() {
        let table = env_table(lookup(&[
            ("SERVICE_NAME", "nginx"),
            ("CHECK_INTERVAL", " 60 "),
            ("DRY_RUN", "TRUE"),
            ("SMTP_TO", "ops@example.com, oncall@example.com,"),
            ("ENABLE_WEBHOOKS", "on"),
            ("LOG_LEVEL", "WARNING"),
        ]))
        .expect("valid environment");

        let monitor = table["monitor"].as_table().expect("monitor table");
        assert_eq!(monitor["service_name"].as_str(), Some("nginx"));
        assert_eq!(monitor["check_interval_secs"].as_integer(), Some(60));
        assert_eq!(monitor["dry_run"].as_bool(), Some(true));

        let to = table["notify"]["email"]["to"].as_array().expect("recipients");
        assert_eq!(
            to,
            &vec![
                Value::String("ops@example.com".to_string()),
                Value::String("oncall@example.com".to_string()),
            ]
        );
        assert_eq!(table["notify"]["webhook"]["enabled"].as_bool(), Some(true));
        assert_eq!(table["logging"]["level"].as_str(), Some("warn"));
    }

    #[test]
    fn malformed_numbers_and_flags_name_the_variable() {
        let error = env_table(lookup(&[("CHECK_INTERVAL", "5m")])).expect_err("bad number");
        assert!(matches!(
            &error,
            ConfigError::Environment { name, .. } if name == "CHECK_INTERVAL"
        ));
        assert!(error.to_string().contains("CHECK_INTERVAL"));

        let error = env_table(lookup(&[("DRY_RUN", "maybe")])).expect_err("bad flag");
        assert!(matches!(error, ConfigError::Environment { .. }));

        let error = env_table(lookup(&[("RETRY_ATTEMPTS", "-1")])).expect_err("negative");
        assert!(matches!(error, ConfigError::Environment { .. }));
    }

    #[test]
    fn nested_tables_merge_key_by_key() {
        let mut base: Table = toml::from_str(
            "[notify.email]\nfrom = \"env@example.com\"\nto = [\"env@example.com\"]\n",
        )
        .expect("base table");
        let overlay: Table =
            toml::from_str("[notify.email]\nto = [\"file@example.com\"]\n").expect("overlay");

        merge_tables(&mut base, overlay);

        let email = &base["notify"]["email"];
        assert_eq!(email["from"].as_str(), Some("env@example.com"));
        assert_eq!(
            email["to"].as_array().map(Vec::len),
            Some(1),
            "file list replaces the environment list"
        );
        assert_eq!(email["to"][0].as_str(), Some("file@example.com"));
    }
}
