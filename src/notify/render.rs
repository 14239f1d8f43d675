use std::fmt::Write as _;

use html_escape::encode_text;

use super::payload::{AlertKind, AlertPayload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAlert {
    pub subject: String,
    pub text: String,
    pub html: String,
}

const FAILURE_COLOR: &str = "#dc3545";
const RECOVERY_COLOR: &str = "#28a745";

pub fn render_alert(payload: &AlertPayload) -> RenderedAlert {
    RenderedAlert {
        subject: subject_line(payload),
        text: text_body(payload),
        html: html_body(payload),
    }
}

pub fn subject_line(payload: &AlertPayload) -> String {
    match payload.kind {
        AlertKind::Failure if payload.repeat => format!(
            "[ALERT] {} service still down on {} ({} consecutive failed checks)",
            payload.service, payload.hostname, payload.consecutive_failures
        ),
        AlertKind::Failure => format!(
            "[ALERT] {} service down on {}",
            payload.service, payload.hostname
        ),
        AlertKind::Recovery => format!(
            "[RECOVERY] {} service restored on {}",
            payload.service, payload.hostname
        ),
    }
}

fn timestamp(payload: &AlertPayload) -> String {
    payload
        .observed_at
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}

fn text_body(payload: &AlertPayload) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "{} ALERT: {} Service Monitoring\n",
        payload.kind.label(),
        payload.service
    );
    let _ = writeln!(body, "Timestamp: {}", timestamp(payload));
    let _ = writeln!(body, "Hostname: {}", payload.hostname);
    let _ = writeln!(body, "Service: {}", payload.service);
    let _ = writeln!(body, "Status: {}", payload.status_text());
    if payload.kind == AlertKind::Failure {
        let _ = writeln!(
            body,
            "Consecutive failed checks: {}",
            payload.consecutive_failures
        );
    }

    if let Some(metrics) = payload.metrics {
        let _ = writeln!(body, "\nSystem Statistics:");
        let _ = writeln!(body, "- CPU Usage: {:.1}%", metrics.cpu_percent);
        let _ = writeln!(body, "- Memory Usage: {:.1}%", metrics.memory_percent);
        let _ = writeln!(body, "- Disk Usage: {:.1}%", metrics.disk_percent);
    }

    if let Some(logs) = &payload.recent_logs {
        let _ = writeln!(body, "\nRecent Service Logs:\n{}", logs.trim_end());
    }

    let _ = write!(
        body,
        "\n---\nThis is an automated alert from svcwatch v{}\n",
        env!("CARGO_PKG_VERSION")
    );
    body
}

fn html_body(payload: &AlertPayload) -> String {
    let color = match payload.kind {
        AlertKind::Failure => FAILURE_COLOR,
        AlertKind::Recovery => RECOVERY_COLOR,
    };
    let service = encode_text(&payload.service);
    let hostname = encode_text(&payload.hostname);

    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<style>\n\
         body {{ font-family: Arial, sans-serif; color: #333; }}\n\
         .header {{ background-color: {color}; color: white; padding: 20px; }}\n\
         .content {{ padding: 20px; }}\n\
         .stats {{ background-color: #f8f9fa; padding: 15px; margin: 10px 0; }}\n\
         .logs {{ background-color: #f1f1f1; padding: 15px; margin: 10px 0; font-family: monospace; font-size: 12px; overflow-x: auto; }}\n\
         .footer {{ color: #666; font-size: 12px; padding: 10px; }}\n\
         </style>\n</head>\n<body>\n"
    );
    let _ = writeln!(
        html,
        "<div class=\"header\"><h2>{} ALERT: {} Service</h2></div>",
        payload.kind.label(),
        service
    );
    let _ = writeln!(html, "<div class=\"content\">");
    let _ = writeln!(
        html,
        "<p><strong>Timestamp:</strong> {}</p>",
        timestamp(payload)
    );
    let _ = writeln!(html, "<p><strong>Hostname:</strong> {}</p>", hostname);
    let _ = writeln!(html, "<p><strong>Service:</strong> {}</p>", service);
    let _ = writeln!(
        html,
        "<p><strong>Status:</strong> <code>{}</code></p>",
        encode_text(payload.status_text())
    );

    if let Some(metrics) = payload.metrics {
        let _ = writeln!(
            html,
            "<div class=\"stats\"><h3>System Statistics</h3><ul>\
             <li>CPU Usage: {:.1}%</li><li>Memory Usage: {:.1}%</li><li>Disk Usage: {:.1}%</li>\
             </ul></div>",
            metrics.cpu_percent, metrics.memory_percent, metrics.disk_percent
        );
    }

    if let Some(logs) = &payload.recent_logs {
        let _ = writeln!(
            html,
            "<div class=\"logs\"><h3>Recent Service Logs</h3><pre>{}</pre></div>",
            encode_text(logs.trim_end())
        );
    }

    let _ = write!(
        html,
        "</div>\n<div class=\"footer\"><p>This is an automated alert from svcwatch v{}</p></div>\n</body>\n</html>\n",
        env!("CARGO_PKG_VERSION")
    );
    html
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::render_alert;
    use crate::host_context::SystemSnapshot;
    use crate::monitor::ServiceStatus;
    use crate::notify::payload::{AlertKind, AlertPayload};

    fn payload(kind: AlertKind) -> AlertPayload {
        AlertPayload {
            kind,
            service: "squid".to_string(),
            hostname: "proxy-01".to_string(),
            status: ServiceStatus::Down,
            is_active: false,
            detail: Some("failed".to_string()),
            observed_at: DateTime::from_timestamp(0, 0).expect("valid timestamp"),
            consecutive_failures: 1,
            repeat: false,
            metrics: None,
            recent_logs: None,
            cycle_id: 1,
        }
    }

    #[test]
    fn failure_subject_names_service_and_host() {
        let rendered = render_alert(&payload(AlertKind::Failure));
        assert_eq!(rendered.subject, "[ALERT] squid service down on proxy-01");
        assert!(rendered.text.contains("FAILURE ALERT: squid"));
        assert!(rendered.text.contains("Status: failed"));
        assert!(rendered.text.contains("Timestamp: 1970-01-01 00:00:00 UTC"));
        assert!(rendered.html.contains("#dc3545"));
    }

    #[test]
    fn recovery_subject_and_color() {
        let mut recovery = payload(AlertKind::Recovery);
        recovery.status = ServiceStatus::Up;
        recovery.detail = Some("active".to_string());
        let rendered = render_alert(&recovery);
        assert_eq!(
            rendered.subject,
            "[RECOVERY] squid service restored on proxy-01"
        );
        assert!(rendered.html.contains("#28a745"));
        assert!(!rendered.text.contains("Consecutive failed checks"));
    }

    #[test]
    fn repeat_subject_mentions_failure_count() {
        let mut repeat = payload(AlertKind::Failure);
        repeat.repeat = true;
        repeat.consecutive_failures = 12;
        let rendered = render_alert(&repeat);
        assert!(rendered.subject.contains("still down"));
        assert!(rendered.subject.contains("12 consecutive"));
    }

    #[test]
    fn context_sections_render_and_html_is_escaped() {
        let mut with_context = payload(AlertKind::Failure);
        with_context.metrics = Some(SystemSnapshot {
            cpu_percent: 12.34,
            memory_percent: 56.0,
            disk_percent: 78.9,
        });
        with_context.recent_logs = Some("<script>alert(1)</script>\n".to_string());

        let rendered = render_alert(&with_context);
        assert!(rendered.text.contains("- CPU Usage: 12.3%"));
        assert!(rendered.text.contains("<script>alert(1)</script>"));
        assert!(rendered.html.contains("&lt;script&gt;"));
        assert!(!rendered.html.contains("<script>"));
    }
}
