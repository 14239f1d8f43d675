use chrono::{DateTime, Utc};

use super::state::{Decision, MonitorPhase, MonitorState, Observation, ServiceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionPolicy {
    pub cooldown_secs: u64,
    /// Consecutive unknown observations after which an unknown counts as a
    /// failure. Zero disables escalation.
    pub unknown_escalation_after: u32,
}

impl DecisionPolicy {
    pub fn with_cooldown(cooldown_secs: u64) -> Self {
        Self {
            cooldown_secs,
            unknown_escalation_after: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub state: MonitorState,
    pub decision: Decision,
    pub escalated_unknown: bool,
    /// Set on a failure alert for an outage that was already reported.
    pub repeat: bool,
}

enum Signal {
    Healthy,
    Failing,
}

/// Advances the monitor by one observation. The observation's timestamp is
/// the clock used for cooldown gating.
pub fn decide(
    observation: &Observation,
    prior: &MonitorState,
    policy: &DecisionPolicy,
) -> Evaluation {
    let now = observation.observed_at;
    let mut state = prior.clone();
    state.last_checked_at = Some(now);
    state.last_detail = observation.detail.clone();

    let mut escalated_unknown = false;
    let signal = match observation.status {
        ServiceStatus::Up => {
            state.consecutive_unknowns = 0;
            Signal::Healthy
        }
        ServiceStatus::Down => {
            state.consecutive_unknowns = 0;
            Signal::Failing
        }
        ServiceStatus::Unknown => {
            state.consecutive_unknowns = state.consecutive_unknowns.saturating_add(1);
            if !should_escalate(state.consecutive_unknowns, policy) {
                if !state.currently_alerting() {
                    state.phase = MonitorPhase::Normal {
                        last_status: ServiceStatus::Unknown,
                    };
                }
                return Evaluation {
                    state,
                    decision: Decision::NoAction,
                    escalated_unknown,
                    repeat: false,
                };
            }
            escalated_unknown = true;
            Signal::Failing
        }
    };

    let mut repeat = false;
    let decision = match (signal, prior.phase) {
        (Signal::Failing, MonitorPhase::Normal { .. }) => {
            state.consecutive_failures = state.consecutive_failures.saturating_add(1);
            state.phase = MonitorPhase::Alerting {
                last_alert_sent_at: now,
            };
            Decision::SendFailureAlert
        }
        (Signal::Failing, MonitorPhase::Alerting { last_alert_sent_at }) => {
            state.consecutive_failures = state.consecutive_failures.saturating_add(1);
            if cooldown_elapsed(last_alert_sent_at, now, policy.cooldown_secs) {
                state.phase = MonitorPhase::Alerting {
                    last_alert_sent_at: now,
                };
                repeat = true;
                Decision::SendFailureAlert
            } else {
                Decision::NoAction
            }
        }
        (Signal::Healthy, phase) => {
            state.consecutive_failures = 0;
            state.last_success_at = Some(now);
            state.phase = MonitorPhase::Normal {
                last_status: ServiceStatus::Up,
            };
            match phase {
                MonitorPhase::Alerting { .. } => Decision::SendRecoveryAlert,
                MonitorPhase::Normal { .. } => Decision::NoAction,
            }
        }
    };

    Evaluation {
        state,
        decision,
        escalated_unknown,
        repeat,
    }
}

fn should_escalate(consecutive_unknowns: u32, policy: &DecisionPolicy) -> bool {
    policy.unknown_escalation_after > 0 && consecutive_unknowns >= policy.unknown_escalation_after
}

// A clock that moved backwards never counts as an elapsed cooldown.
fn cooldown_elapsed(last_sent: DateTime<Utc>, now: DateTime<Utc>, cooldown_secs: u64) -> bool {
    let cooldown = i64::try_from(cooldown_secs).unwrap_or(i64::MAX);
    now.signed_duration_since(last_sent).num_seconds() >= cooldown
}
