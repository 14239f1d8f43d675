use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::host_context::{AlertContext, SystemSnapshot};
use crate::monitor::{Decision, Evaluation, Observation, ServiceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Failure,
    Recovery,
}

impl AlertKind {
    pub fn from_decision(decision: Decision) -> Option<Self> {
        match decision {
            Decision::SendFailureAlert => Some(AlertKind::Failure),
            Decision::SendRecoveryAlert => Some(AlertKind::Recovery),
            Decision::NoAction => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AlertKind::Failure => "FAILURE",
            AlertKind::Recovery => "RECOVERY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertPayload {
    pub kind: AlertKind,
    pub service: String,
    pub hostname: String,
    pub status: ServiceStatus,
    pub is_active: bool,
    pub detail: Option<String>,
    pub observed_at: DateTime<Utc>,
    pub consecutive_failures: u32,
    /// Set on reminder alerts for an outage that was already reported.
    pub repeat: bool,
    pub metrics: Option<SystemSnapshot>,
    pub recent_logs: Option<String>,
    pub cycle_id: u64,
}

impl AlertPayload {
    /// Returns `None` when the evaluation asks for no notification.
    pub fn build(
        service: &str,
        hostname: &str,
        observation: &Observation,
        evaluation: &Evaluation,
        context: AlertContext,
        cycle_id: u64,
    ) -> Option<Self> {
        let kind = AlertKind::from_decision(evaluation.decision)?;
        Some(Self {
            kind,
            service: service.to_string(),
            hostname: hostname.to_string(),
            status: observation.status,
            is_active: observation.status == ServiceStatus::Up,
            detail: observation.detail.clone(),
            observed_at: observation.observed_at,
            consecutive_failures: evaluation.state.consecutive_failures,
            repeat: kind == AlertKind::Failure && evaluation.repeat,
            metrics: context.metrics,
            recent_logs: context.recent_logs,
            cycle_id,
        })
    }

    pub fn status_text(&self) -> &str {
        self.detail.as_deref().unwrap_or(self.status.as_str())
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::{AlertKind, AlertPayload};
    use crate::host_context::AlertContext;
    use crate::monitor::{Decision, DecisionPolicy, Evaluation, Observation, ServiceStatus, decide};

    fn observe(status: ServiceStatus, secs: i64) -> Observation {
        Observation::new(
            status,
            DateTime::from_timestamp(secs, 0).expect("valid timestamp"),
            None,
        )
    }

    fn build(observation: &Observation, evaluation: &Evaluation) -> Option<AlertPayload> {
        AlertPayload::build(
            "squid",
            "proxy-01",
            observation,
            evaluation,
            AlertContext::default(),
            7,
        )
    }

    #[test]
    fn kind_follows_decision() {
        assert_eq!(
            AlertKind::from_decision(Decision::SendFailureAlert),
            Some(AlertKind::Failure)
        );
        assert_eq!(
            AlertKind::from_decision(Decision::SendRecoveryAlert),
            Some(AlertKind::Recovery)
        );
        assert_eq!(AlertKind::from_decision(Decision::NoAction), None);
    }

    #[test]
    fn reminder_alerts_are_marked_repeat() {
        let policy = DecisionPolicy::with_cooldown(3600);
        let first_down = observe(ServiceStatus::Down, 0);
        let first = decide(&first_down, &Default::default(), &policy);
        let payload = build(&first_down, &first).expect("failure alert");
        assert!(!payload.repeat);

        let still_down = observe(ServiceStatus::Down, 1800);
        let quiet = decide(&still_down, &first.state, &policy);
        assert_eq!(build(&still_down, &quiet), None);

        let reminder_at = observe(ServiceStatus::Down, 3700);
        let reminder = decide(&reminder_at, &quiet.state, &policy);
        let payload = build(&reminder_at, &reminder).expect("reminder alert");

        assert!(payload.repeat);
        assert!(!payload.is_active);
        assert_eq!(payload.consecutive_failures, 3);
        assert_eq!(payload.status_text(), "down");

        let json = serde_json::to_value(&payload).expect("serialize payload");
        assert_eq!(json["kind"], "failure");
        assert_eq!(json["status"], "down");
        assert_eq!(json["service"], "squid");
        assert_eq!(json["cycle_id"], 7);
    }

    #[test]
    fn recovery_is_never_a_repeat() {
        let policy = DecisionPolicy::with_cooldown(0);
        let down = decide(&observe(ServiceStatus::Down, 0), &Default::default(), &policy);
        let up_at = observe(ServiceStatus::Up, 60);
        let up = decide(&up_at, &down.state, &policy);

        let payload = build(&up_at, &up).expect("recovery alert");
        assert_eq!(payload.kind, AlertKind::Recovery);
        assert!(!payload.repeat);
        assert!(payload.is_active);
    }
}
