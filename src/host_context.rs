use std::path::Path;

use serde::Serialize;
use sysinfo::{CpuExt, DiskExt, System, SystemExt};
use tokio::time::sleep;

use crate::system::run_cmd;

const MAX_LOG_EXCERPT_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemSnapshot {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub disk_percent: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertContext {
    pub metrics: Option<SystemSnapshot>,
    pub recent_logs: Option<String>,
}

/// Gathers the host details attached to an alert. Only consulted when an
/// alert is actually going out.
pub trait ContextCollector {
    async fn collect(&mut self, service: &str) -> AlertContext;
}

pub struct HostContextCollector {
    system: System,
    include_metrics: bool,
    log_lines: u32,
    timeout_secs: u64,
}

impl HostContextCollector {
    pub fn new(include_metrics: bool, log_lines: u32, timeout_secs: u64) -> Self {
        Self {
            system: System::new(),
            include_metrics,
            log_lines,
            timeout_secs,
        }
    }

    /// CPU usage is the load between two refreshes, so the second one waits
    /// out sysinfo's minimum interval. A single refresh reports the average
    /// since boot.
    async fn snapshot(&mut self) -> SystemSnapshot {
        self.system.refresh_cpu();
        sleep(System::MINIMUM_CPU_UPDATE_INTERVAL).await;
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.system.refresh_disks_list();
        self.system.refresh_disks();

        let cpu_percent = self.system.global_cpu_info().cpu_usage();
        let memory_percent = percent(
            self.system.used_memory() as f64,
            self.system.total_memory() as f64,
        );

        let disk_percent = self
            .system
            .disks()
            .iter()
            .find(|disk| disk.mount_point() == Path::new("/"))
            .or_else(|| self.system.disks().first())
            .map(|disk| {
                let total = disk.total_space();
                percent(
                    total.saturating_sub(disk.available_space()) as f64,
                    total as f64,
                )
            })
            .unwrap_or(0.0);

        SystemSnapshot {
            cpu_percent,
            memory_percent,
            disk_percent,
        }
    }
}

impl ContextCollector for HostContextCollector {
    async fn collect(&mut self, service: &str) -> AlertContext {
        let metrics = if self.include_metrics {
            Some(self.snapshot().await)
        } else {
            None
        };
        let recent_logs = if self.log_lines > 0 {
            Some(recent_logs(service, self.log_lines, self.timeout_secs).await)
        } else {
            None
        };

        AlertContext {
            metrics,
            recent_logs,
        }
    }
}

fn percent(used: f64, total: f64) -> f32 {
    if total > 0.0 {
        ((used / total) * 100.0) as f32
    } else {
        0.0
    }
}

pub fn hostname() -> String {
    System::new()
        .host_name()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "unknown-host".to_string())
}

/// Tail of the unit's journal. Failures are described in the returned text
/// rather than surfaced, since the excerpt is informational.
pub async fn recent_logs(service: &str, lines: u32, timeout_secs: u64) -> String {
    let lines = lines.to_string();
    match run_cmd(
        "journalctl",
        &["-u", service, "-n", &lines, "--no-pager"],
        timeout_secs,
    )
    .await
    {
        Ok(output) if output.success() => tail_bytes(&output.stdout, MAX_LOG_EXCERPT_BYTES),
        Ok(output) => format!("Failed to retrieve logs: {}", output.stderr.trim()),
        Err(error) => format!("Error retrieving logs: {}", error),
    }
}

fn tail_bytes(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }

    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    let tail = &text[start..];
    match tail.find('\n') {
        Some(newline) => tail[newline + 1..].to_string(),
        None => tail.to_string(),
    }
}

#[cfg(test)]
pub(crate) struct StaticContext(pub AlertContext);

#[cfg(test)]
impl ContextCollector for StaticContext {
    async fn collect(&mut self, _service: &str) -> AlertContext {
        self.0.clone()
    }
}
