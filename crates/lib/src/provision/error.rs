//! Failure taxonomy for infrastructure tool invocations.
//!
//! A failed invocation is classified from its stderr, first match wins:
//! state lock, then no-changes, then validation, otherwise a generic exit error.

use std::fmt;

use thiserror::Error;

use crate::util::process::ProcessError;

const LOCK_MARKERS: &[&str] = &["Error locking state", "Error acquiring the state lock"];
const NO_CHANGES_MARKERS: &[&str] = &["No changes", "no changes"];
const VALIDATION_MARKERS: &[&str] = &["Error: Invalid", "Error: Unsupported"];

/// Where in the configuration a validation error points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
  pub file: String,
  pub line: u32,
}

impl fmt::Display for SourceLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.file, self.line)
  }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
  #[error("terraform state locked (lock ID: {lock_id}): {message}")]
  StateLocked { lock_id: String, message: String },

  /// Not a real failure; callers treat it as success with nothing to do.
  #[error("no changes detected")]
  NoChanges,

  #[error("validation error{}: {message}", .location.as_ref().map(|l| format!(" at {l}")).unwrap_or_default())]
  Validation {
    message: String,
    location: Option<SourceLocation>,
  },

  #[error("terraform {command} failed with exit code {exit_code}\nstderr: {stderr}")]
  Exit {
    command: String,
    exit_code: i32,
    stdout: String,
    stderr: String,
  },

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error("failed to parse terraform {command} output: {source}")]
  InvalidOutput {
    command: String,
    #[source]
    source: serde_json::Error,
  },
}

impl ProvisionError {
  /// Whether this is the benign "nothing to do" outcome.
  pub fn is_no_op(&self) -> bool {
    matches!(self, ProvisionError::NoChanges)
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, ProvisionError::Process(e) if e.is_cancelled())
  }

  pub fn lock_id(&self) -> Option<&str> {
    match self {
      ProvisionError::StateLocked { lock_id, .. } => Some(lock_id),
      _ => None,
    }
  }
}

/// Classify a failed invocation of `command`.
pub fn classify(command: &str, exit_code: i32, stdout: &str, stderr: &str) -> ProvisionError {
  if LOCK_MARKERS.iter().any(|m| stderr.contains(m)) {
    return ProvisionError::StateLocked {
      lock_id: extract_lock_id(stderr),
      message: stderr.trim().to_string(),
    };
  }
  if NO_CHANGES_MARKERS.iter().any(|m| stderr.contains(m)) {
    return ProvisionError::NoChanges;
  }
  if VALIDATION_MARKERS.iter().any(|m| stderr.contains(m)) {
    return ProvisionError::Validation {
      message: stderr.trim().to_string(),
      location: extract_location(stderr),
    };
  }
  ProvisionError::Exit {
    command: command.to_string(),
    exit_code,
    stdout: stdout.to_string(),
    stderr: stderr.to_string(),
  }
}

/// Text after the first `ID:`, trimmed, up to the next line break or the end of input.
/// Empty when there is no `ID:` marker.
pub fn extract_lock_id(stderr: &str) -> String {
  let Some(idx) = stderr.find("ID:") else {
    return String::new();
  };
  let rest = &stderr[idx + "ID:".len()..];
  let end = rest.find(['\n', '\r']).unwrap_or(rest.len());
  rest[..end].trim().to_string()
}

/// Parse the `on FILE line N` pointer terraform prints under a diagnostic.
pub fn extract_location(stderr: &str) -> Option<SourceLocation> {
  stderr.lines().find_map(|line| {
    let rest = line.trim().strip_prefix("on ")?;
    let (file, tail) = rest.split_once(" line ")?;
    let digits: String = tail.chars().take_while(char::is_ascii_digit).collect();
    let line = digits.parse().ok().filter(|n| *n > 0)?;
    Some(SourceLocation {
      file: file.trim().to_string(),
      line,
    })
  })
}
