use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::state::{MonitorPhase, MonitorState, ServiceStatus};

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("state file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("state file {path} is not a valid state record: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("state file {path} violates state invariants: {reason}")]
    Invalid { path: String, reason: String },
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait StateStore {
    /// Never fails: anything unreadable degrades to the initial state.
    fn load(&self) -> MonitorState;
    fn save(&self, state: &MonitorState) -> Result<(), StateStoreError>;
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn try_load(&self) -> Result<Option<MonitorState>, StateStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateStoreError::Io {
                    path: self.display_path(),
                    source,
                });
            }
        };

        let record: StateRecord =
            serde_json::from_str(&raw).map_err(|source| StateStoreError::Parse {
                path: self.display_path(),
                source,
            })?;

        record
            .into_state()
            .map(Some)
            .map_err(|reason| StateStoreError::Invalid {
                path: self.display_path(),
                reason,
            })
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn io_error(&self, source: std::io::Error) -> StateStoreError {
        StateStoreError::Io {
            path: self.display_path(),
            source,
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> MonitorState {
        match self.try_load() {
            Ok(Some(state)) => state,
            Ok(None) => {
                log::info!(
                    "state_file_missing path={} action=start_from_initial_state",
                    self.path.display()
                );
                MonitorState::default()
            }
            Err(error) => {
                log::warn!(
                    "state_load_degraded path={} action=start_from_initial_state error={}",
                    self.path.display(),
                    error
                );
                MonitorState::default()
            }
        }
    }

    fn save(&self, state: &MonitorState) -> Result<(), StateStoreError> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;

        let record = StateRecord::from_state(state);
        let mut temp = NamedTempFile::new_in(parent).map_err(|source| self.io_error(source))?;
        serde_json::to_writer_pretty(&mut temp, &record)?;
        temp.write_all(b"\n")
            .map_err(|source| self.io_error(source))?;
        temp.as_file()
            .sync_all()
            .map_err(|source| self.io_error(source))?;
        temp.persist(&self.path)
            .map_err(|error| self.io_error(error.error))?;
        Ok(())
    }
}

/// On-disk shape of [`MonitorState`]. Unknown fields are ignored and missing
/// ones take their initial values. The aliases and the boolean status form
/// keep the older v0 record layout readable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct StateRecord {
    #[serde(deserialize_with = "deserialize_status")]
    last_status: ServiceStatus,
    #[serde(alias = "last_alert_time", deserialize_with = "deserialize_timestamp")]
    last_alert_sent_at: Option<DateTime<Utc>>,
    currently_alerting: bool,
    consecutive_failures: u32,
    consecutive_unknowns: u32,
    #[serde(alias = "last_check", deserialize_with = "deserialize_timestamp")]
    last_checked_at: Option<DateTime<Utc>>,
    #[serde(alias = "last_success_time", deserialize_with = "deserialize_timestamp")]
    last_success_at: Option<DateTime<Utc>>,
    last_detail: Option<String>,
}

impl StateRecord {
    fn from_state(state: &MonitorState) -> Self {
        Self {
            last_status: state.last_status(),
            last_alert_sent_at: state.last_alert_sent_at(),
            currently_alerting: state.currently_alerting(),
            consecutive_failures: state.consecutive_failures,
            consecutive_unknowns: state.consecutive_unknowns,
            last_checked_at: state.last_checked_at,
            last_success_at: state.last_success_at,
            last_detail: state.last_detail.clone(),
        }
    }

    fn into_state(self) -> Result<MonitorState, String> {
        let phase = if self.currently_alerting {
            let Some(last_alert_sent_at) = self.last_alert_sent_at else {
                return Err("currently_alerting is set without last_alert_sent_at".to_string());
            };
            if self.last_status != ServiceStatus::Down {
                return Err(format!(
                    "currently_alerting is set but last_status is {}",
                    self.last_status
                ));
            }
            MonitorPhase::Alerting { last_alert_sent_at }
        } else {
            MonitorPhase::Normal {
                last_status: self.last_status,
            }
        };

        Ok(MonitorState {
            phase,
            consecutive_failures: self.consecutive_failures,
            consecutive_unknowns: self.consecutive_unknowns,
            last_checked_at: self.last_checked_at,
            last_success_at: self.last_success_at,
            last_detail: self.last_detail,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Named(ServiceStatus),
    Flag(bool),
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<ServiceStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawStatus>::deserialize(deserializer)? {
        Some(RawStatus::Named(status)) => status,
        Some(RawStatus::Flag(true)) => ServiceStatus::Up,
        Some(RawStatus::Flag(false)) => ServiceStatus::Down,
        None => ServiceStatus::Unknown,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Epoch(i64),
    EpochFractional(f64),
    Text(String),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<RawTimestamp>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let parsed = match raw {
        RawTimestamp::Epoch(secs) => DateTime::from_timestamp(secs, 0),
        RawTimestamp::EpochFractional(secs) => {
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1_000_000_000.0) as u32;
            DateTime::from_timestamp(whole as i64, nanos)
        }
        RawTimestamp::Text(text) => parse_text_timestamp(&text),
    };

    parsed
        .map(Some)
        .ok_or_else(|| D::Error::custom("timestamp is neither RFC 3339 nor epoch seconds"))
}

// Naive ISO-8601 values carry no offset and are read as UTC.
fn parse_text_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(value) = DateTime::parse_from_rfc3339(text) {
        return Some(value.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// In-memory store for scheduler tests. `journal`, when shared with a
/// notifier mock, records the order of saves and notifications.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    pub(crate) saved: std::sync::Arc<std::sync::Mutex<Option<MonitorState>>>,
    pub(crate) failing: bool,
    pub(crate) journal: Option<std::sync::Arc<std::sync::Mutex<Vec<String>>>>,
}

#[cfg(test)]
impl MemoryStore {
    pub(crate) fn with_state(state: MonitorState) -> Self {
        let store = Self::default();
        *store.saved.lock().expect("store lock") = Some(state);
        store
    }

    pub(crate) fn current(&self) -> Option<MonitorState> {
        self.saved.lock().expect("store lock").clone()
    }
}

#[cfg(test)]
impl StateStore for MemoryStore {
    fn load(&self) -> MonitorState {
        self.current().unwrap_or_default()
    }

    fn save(&self, state: &MonitorState) -> Result<(), StateStoreError> {
        if let Some(journal) = &self.journal {
            journal.lock().expect("journal lock").push("save".to_string());
        }
        if self.failing {
            return Err(StateStoreError::Io {
                path: "memory".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        *self.saved.lock().expect("store lock") = Some(state.clone());
        Ok(())
    }
}
