use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Up,
    Down,
    #[default]
    Unknown,
}

impl ServiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceStatus::Up => "up",
            ServiceStatus::Down => "down",
            ServiceStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One probe result, stamped with the time it was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub status: ServiceStatus,
    pub observed_at: DateTime<Utc>,
    pub detail: Option<String>,
}

impl Observation {
    pub fn new(status: ServiceStatus, observed_at: DateTime<Utc>, detail: Option<String>) -> Self {
        Self {
            status,
            observed_at,
            detail,
        }
    }
}

/// Alerting implies the service was last seen down, so that phase carries no
/// separate status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    Normal { last_status: ServiceStatus },
    Alerting { last_alert_sent_at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorState {
    pub phase: MonitorPhase,
    pub consecutive_failures: u32,
    pub consecutive_unknowns: u32,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_detail: Option<String>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            phase: MonitorPhase::Normal {
                last_status: ServiceStatus::Unknown,
            },
            consecutive_failures: 0,
            consecutive_unknowns: 0,
            last_checked_at: None,
            last_success_at: None,
            last_detail: None,
        }
    }
}

impl MonitorState {
    pub fn last_status(&self) -> ServiceStatus {
        match self.phase {
            MonitorPhase::Normal { last_status } => last_status,
            MonitorPhase::Alerting { .. } => ServiceStatus::Down,
        }
    }

    pub fn currently_alerting(&self) -> bool {
        matches!(self.phase, MonitorPhase::Alerting { .. })
    }

    pub fn last_alert_sent_at(&self) -> Option<DateTime<Utc>> {
        match self.phase {
            MonitorPhase::Alerting { last_alert_sent_at } => Some(last_alert_sent_at),
            MonitorPhase::Normal { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    NoAction,
    SendFailureAlert,
    SendRecoveryAlert,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::NoAction => "no_action",
            Decision::SendFailureAlert => "send_failure_alert",
            Decision::SendRecoveryAlert => "send_recovery_alert",
        }
    }

    pub fn requires_notification(self) -> bool {
        !matches!(self, Decision::NoAction)
    }
}
