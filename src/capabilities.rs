use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone)]
pub struct Capabilities {
    pub is_systemd: bool,
    pub has_journalctl: bool,
    pub has_sendmail: bool,
}

impl Capabilities {
    pub fn detect(sendmail_path: &str) -> Self {
        let has_systemctl = command_exists("systemctl");

        Self {
            is_systemd: has_systemctl && Path::new("/run/systemd/system").exists(),
            has_journalctl: command_exists("journalctl"),
            has_sendmail: command_exists(sendmail_path),
        }
    }

    /// Logs one warning per missing tool that a configured feature relies on.
    pub fn log_warnings(&self, email_enabled: bool) {
        if !self.is_systemd {
            log::warn!(
                "capability_degraded feature=status_probe reason=systemctl_or_systemd_unavailable"
            );
        }

        if !self.has_journalctl {
            log::warn!("capability_degraded feature=alert_logs reason=journalctl_unavailable");
        }

        if email_enabled && !self.has_sendmail {
            log::warn!("capability_degraded feature=email reason=sendmail_unavailable");
        }
    }
}

fn command_exists(command: &str) -> bool {
    if command.contains('/') {
        return Path::new(command).is_file();
    }

    Command::new("sh")
        .arg("-c")
        .arg("command -v \"$1\" >/dev/null 2>&1")
        .arg("sh")
        .arg(command)
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
