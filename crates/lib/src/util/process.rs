//! Subprocess execution bound to a cancellation context.

use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::context::Context;

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
  /// Exit code, `None` when the process was terminated by a signal.
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl ProcessOutput {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }

  /// Stdout followed by stderr, for error reports.
  pub fn combined(&self) -> String {
    match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
      (true, _) => self.stderr.clone(),
      (_, true) => self.stdout.clone(),
      _ => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
    }
  }
}

#[derive(Debug, Error)]
pub enum ProcessError {
  #[error("{program} was cancelled")]
  Cancelled { program: String },

  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },
}

impl ProcessError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, ProcessError::Cancelled { .. })
  }
}

/// Run `command` to completion, capturing stdout and stderr.
///
/// A non-zero exit is not an error here; callers interpret the exit code. If `ctx` is
/// cancelled before or while the process runs, the process is killed and
/// `ProcessError::Cancelled` is returned.
pub async fn run_process(ctx: &Context, mut command: Command) -> Result<ProcessOutput, ProcessError> {
  let program = command.as_std().get_program().to_string_lossy().to_string();
  if ctx.is_cancelled() {
    return Err(ProcessError::Cancelled { program });
  }

  command.kill_on_drop(true).stdout(Stdio::piped()).stderr(Stdio::piped());
  debug!(program = %program, args = ?command.as_std().get_args().collect::<Vec<_>>(), "spawning process");

  let child = command.spawn().map_err(|source| ProcessError::Spawn {
    program: program.clone(),
    source,
  })?;

  // Dropping the wait future drops the child, and kill_on_drop terminates it.
  let output = tokio::select! {
    output = child.wait_with_output() => output.map_err(|source| ProcessError::Spawn {
      program: program.clone(),
      source,
    })?,
    _ = ctx.cancelled() => {
      warn!(program = %program, "cancelled, killing process");
      return Err(ProcessError::Cancelled { program });
    }
  };

  let result = ProcessOutput {
    code: output.status.code(),
    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
  };
  if !result.stderr.is_empty() {
    debug!(program = %program, stderr = %result.stderr.trim_end(), "process stderr");
  }
  debug!(program = %program, code = ?result.code, "process exited");
  Ok(result)
}
