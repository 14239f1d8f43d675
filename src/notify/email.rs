use chrono::Utc;

use crate::system::run_cmd_with_stdin;

use super::error::NotifyError;
use super::payload::AlertPayload;
use super::render::RenderedAlert;

/// Hands alerts to the local MTA (`sendmail -t -i`), which owns delivery.
#[derive(Debug, Clone)]
pub struct SendmailNotifier {
    sendmail_path: String,
    from: String,
    to: Vec<String>,
    timeout_secs: u64,
}

impl SendmailNotifier {
    pub fn new(sendmail_path: &str, from: &str, to: &[String], timeout_secs: u64) -> Self {
        Self {
            sendmail_path: sendmail_path.to_string(),
            from: from.to_string(),
            to: to.iter().map(|address| address.trim().to_string()).collect(),
            timeout_secs,
        }
    }

    pub async fn send(
        &self,
        payload: &AlertPayload,
        rendered: &RenderedAlert,
    ) -> Result<(), NotifyError> {
        let message = self.compose(payload, rendered);
        let output = run_cmd_with_stdin(
            &self.sendmail_path,
            &["-t", "-i"],
            message.as_bytes(),
            self.timeout_secs,
        )
        .await?;

        if !output.success() {
            return Err(NotifyError::SendmailStatus {
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }

        log::info!(
            "email_sent service={} kind={:?} recipients={}",
            payload.service,
            payload.kind,
            self.to.len()
        );
        Ok(())
    }

    fn compose(&self, payload: &AlertPayload, rendered: &RenderedAlert) -> String {
        let boundary = format!(
            "svcwatch-{}-{}",
            payload.cycle_id,
            payload.observed_at.timestamp_millis()
        );
        let recipients = self
            .to
            .iter()
            .map(|address| header_value(address))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "From: {from}\r\n\
             To: {to}\r\n\
             Subject: {subject}\r\n\
             Date: {date}\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\
             \r\n\
             --{boundary}\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Transfer-Encoding: 8bit\r\n\
             \r\n\
             {text}\r\n\
             --{boundary}\r\n\
             Content-Type: text/html; charset=utf-8\r\n\
             Content-Transfer-Encoding: 8bit\r\n\
             \r\n\
             {html}\r\n\
             --{boundary}--\r\n",
            from = header_value(&self.from),
            to = recipients,
            subject = header_value(&rendered.subject),
            date = Utc::now().to_rfc2822(),
            text = rendered.text,
            html = rendered.html,
        )
    }
}

// Header values must stay on one line or sendmail -t would read injected headers.
fn header_value(value: &str) -> String {
    value
        .chars()
        .map(|character| match character {
            '\r' | '\n' => ' ',
            other => other,
        })
        .collect()
}
