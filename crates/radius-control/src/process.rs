//! External command execution with a deadline

use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{program}' did not finish within {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },
}

#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&self.stderr);
        text
    }
}

/// Run `argv` to completion; the child is killed if the deadline passes
pub async fn run(argv: &[String], timeout: Duration) -> Result<CommandOutput, CommandError> {
    let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;
    debug!(program = %program, args = ?args, "running command");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CommandError::Spawn {
            program: program.clone(),
            source,
        })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| CommandError::Timeout {
            program: program.clone(),
            timeout,
        })?
        .map_err(|source| CommandError::Spawn {
            program: program.clone(),
            source,
        })?;

    Ok(CommandOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    #[tokio::test]
    async fn test_run_captures_output() {
        let command = argv(&["sh", "-c", "echo out; echo err >&2; exit 3"]);
        let output = run(&command, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.combined(), "out\nerr\n");
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let err = run(&argv(&["sleep", "5"]), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = run(&argv(&["/nonexistent/radius-control-test"]), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
        assert!(matches!(run(&[], Duration::from_secs(1)).await, Err(CommandError::Empty)));
    }
}
