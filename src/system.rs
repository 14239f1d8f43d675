use std::process::Stdio;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command timed out after {timeout_secs}s: {cmd}")]
    Timeout { cmd: String, timeout_secs: u64 },
    #[error("failed to execute command {cmd}: {source}")]
    Io { cmd: String, source: std::io::Error },
}

pub async fn run_cmd(
    cmd: &str,
    args: &[&str],
    timeout_secs: u64,
) -> Result<CommandOutput, CommandError> {
    let mut child = Command::new(cmd);
    child.args(args).stdin(Stdio::null()).kill_on_drop(true);

    let output = timeout(Duration::from_secs(timeout_secs), child.output())
        .await
        .map_err(|_| CommandError::Timeout {
            cmd: cmd.to_string(),
            timeout_secs,
        })?
        .map_err(|source| CommandError::Io {
            cmd: cmd.to_string(),
            source,
        })?;

    Ok(into_output(output))
}

/// Runs `cmd` with `input` written to its stdin, closing the pipe before
/// waiting for exit.
pub async fn run_cmd_with_stdin(
    cmd: &str,
    args: &[&str],
    input: &[u8],
    timeout_secs: u64,
) -> Result<CommandOutput, CommandError> {
    let io_error = |source: std::io::Error| CommandError::Io {
        cmd: cmd.to_string(),
        source,
    };

    let run = async {
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(io_error)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input).await.map_err(io_error)?;
            stdin.shutdown().await.map_err(io_error)?;
        }

        child.wait_with_output().await.map_err(io_error)
    };

    let output = timeout(Duration::from_secs(timeout_secs), run)
        .await
        .map_err(|_| CommandError::Timeout {
            cmd: cmd.to_string(),
            timeout_secs,
        })??;

    Ok(into_output(output))
}

fn into_output(output: std::process::Output) -> CommandOutput {
    CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        status: output.status.code().unwrap_or(-1),
    }
}
