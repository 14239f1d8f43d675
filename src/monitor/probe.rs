use crate::system::{CommandOutput, run_cmd};

use super::state::ServiceStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub status: ServiceStatus,
    pub detail: Option<String>,
}

impl ProbeReport {
    pub fn new(status: ServiceStatus, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            status,
            detail: (!detail.trim().is_empty()).then(|| detail.trim().to_string()),
        }
    }

    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::new(ServiceStatus::Unknown, detail)
    }
}

/// Answers whether a service is running. Implementations report their own
/// faults as `Unknown` instead of returning errors.
pub trait StatusProbe {
    async fn probe(&mut self, service: &str) -> ProbeReport;
}

pub struct SystemctlProbe {
    systemctl: String,
    timeout_secs: u64,
}

impl SystemctlProbe {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            systemctl: "systemctl".to_string(),
            timeout_secs,
        }
    }
}

impl StatusProbe for SystemctlProbe {
    async fn probe(&mut self, service: &str) -> ProbeReport {
        if service.is_empty() || service.starts_with('-') || service.contains(char::is_whitespace)
        {
            return ProbeReport::unknown(format!("invalid unit name {:?}", service));
        }

        match run_cmd(
            &self.systemctl,
            &["is-active", "--", service],
            self.timeout_secs,
        )
        .await
        {
            Ok(output) => classify_is_active(&output),
            Err(error) => ProbeReport::unknown(error.to_string()),
        }
    }
}

fn classify_is_active(output: &CommandOutput) -> ProbeReport {
    let state = output.stdout.lines().next().unwrap_or("").trim();

    match state {
        "active" | "reloading" | "refreshing" if output.success() => {
            ProbeReport::new(ServiceStatus::Up, state)
        }
        "inactive" | "failed" | "activating" | "deactivating" | "maintenance" => {
            ProbeReport::new(ServiceStatus::Down, state)
        }
        _ => {
            let stderr = output.stderr.trim();
            let detail = if stderr.is_empty() {
                format!("systemctl exited with status {}: {}", output.status, state)
            } else {
                format!("systemctl exited with status {}: {}", output.status, stderr)
            };
            ProbeReport::unknown(detail)
        }
    }
}

#[cfg(test)]
pub(crate) struct ScriptedProbe {
    sequence: Vec<ProbeReport>,
}

#[cfg(test)]
impl ScriptedProbe {
    pub(crate) fn new(sequence: Vec<ProbeReport>) -> Self {
        Self { sequence }
    }

    pub(crate) fn statuses(statuses: &[ServiceStatus]) -> Self {
        Self::new(
            statuses
                .iter()
                .map(|status| ProbeReport::new(*status, status.as_str()))
                .collect(),
        )
    }
}

#[cfg(test)]
impl StatusProbe for ScriptedProbe {
    async fn probe(&mut self, _service: &str) -> ProbeReport {
        if self.sequence.is_empty() {
            return ProbeReport::unknown("scripted probe exhausted");
        }

        self.sequence.remove(0)
    }
}
