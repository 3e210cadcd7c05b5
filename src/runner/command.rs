//! External process invocation with a hard timeout.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, error};

use crate::error::PhaseError;

/// Lines of stderr kept in a [`PhaseError::Process`].
const STDERR_TAIL_LINES: usize = 20;

/// Captured output of a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A command that ran to completion, successfully or not.
#[derive(Debug, Clone)]
pub struct Finished {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl Finished {
    /// `exit code N`, or `killed by signal`.
    pub fn status_text(&self) -> String {
        self.status
            .code()
            .map_or_else(|| "killed by signal".to_string(), |c| format!("exit code {c}"))
    }

    /// Last lines of stderr, as carried in errors.
    pub fn stderr_tail(&self) -> String {
        tail(&self.stderr, STDERR_TAIL_LINES)
    }
}

/// Run `program args...` to completion and return its output.
///
/// A spawn failure, a nonzero exit or exceeding `timeout` all yield
/// [`PhaseError::Process`]. The child is killed on timeout.
pub async fn run(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<CommandOutput, PhaseError> {
    let finished = wait(program, args, cwd, timeout).await?;
    if finished.status.success() {
        Ok(CommandOutput {
            stdout: finished.stdout,
            stderr: finished.stderr,
        })
    } else {
        Err(PhaseError::Process {
            command: command_line(program, args),
            status: finished.status_text(),
            stderr: finished.stderr_tail(),
        })
    }
}

/// Run `program args...` to completion whatever its exit status.
///
/// Only a spawn failure, a wait failure or exceeding `timeout` are errors
/// ([`PhaseError::Process`]); interpreting the exit status is the caller's
/// job. The child is killed on timeout.
pub async fn wait(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<Finished, PhaseError> {
    let cmd_line = command_line(program, args);
    debug!(command = %cmd_line, "Spawning");

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let child = command.spawn().map_err(|e| PhaseError::Process {
        command: cmd_line.clone(),
        status: "spawn failed".into(),
        stderr: e.to_string(),
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| PhaseError::Process {
            command: cmd_line.clone(),
            status: "wait failed".into(),
            stderr: e.to_string(),
        })?,
        Err(_) => {
            // Dropping the future drops the child; kill_on_drop reaps it.
            error!(command = %cmd_line, ?timeout, "Command timed out");
            return Err(PhaseError::Process {
                command: cmd_line,
                status: format!("timed out after {}s", timeout.as_secs()),
                stderr: String::new(),
            });
        }
    };

    Ok(Finished {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Render a command for logs and error messages.
pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
