use thiserror::Error;

use super::{PipelineState, StageEvent};
use crate::build::BuildError;
use crate::context::Cancelled;
use crate::provision::{Operation, ProvisionError};

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("failed to build {function}: {source}")]
  Build {
    function: String,
    #[source]
    source: BuildError,
  },

  #[error("terraform {operation} failed: {source}")]
  Provision {
    operation: Operation,
    #[source]
    source: ProvisionError,
  },

  #[error("stage expected {expected} in the pipeline config, found {found}")]
  UnexpectedConfig {
    expected: &'static str,
    found: &'static str,
  },

  #[error("parallel stages wrote conflicting values for {kind} '{key}'")]
  MergeConflict { kind: &'static str, key: String },

  #[error("deployment canceled by user")]
  Declined,

  #[error("pipeline cancelled")]
  Cancelled,

  #[error("stage '{stage}' did not complete: {message}")]
  Aborted { stage: String, message: String },
}

impl PipelineError {
  pub fn provision(operation: Operation, source: ProvisionError) -> Self {
    PipelineError::Provision { operation, source }
  }

  pub fn build(function: impl Into<String>, source: BuildError) -> Self {
    PipelineError::Build {
      function: function.into(),
      source,
    }
  }

  /// The underlying provisioning error, if this failure came from the infrastructure tool.
  pub fn provision_error(&self) -> Option<&ProvisionError> {
    match self {
      PipelineError::Provision { source, .. } => Some(source),
      _ => None,
    }
  }

  pub fn build_error(&self) -> Option<&BuildError> {
    match self {
      PipelineError::Build { source, .. } => Some(source),
      _ => None,
    }
  }

  pub fn is_cancelled(&self) -> bool {
    match self {
      PipelineError::Cancelled => true,
      PipelineError::Build { source, .. } => source.is_cancelled(),
      PipelineError::Provision { source, .. } => source.is_cancelled(),
      _ => false,
    }
  }
}

impl From<Cancelled> for PipelineError {
  fn from(_: Cancelled) -> Self {
    PipelineError::Cancelled
  }
}

/// A stage failure together with the events the stage emitted before failing.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct StageFailure {
  #[source]
  pub error: PipelineError,
  pub events: Vec<StageEvent>,
}

impl StageFailure {
  pub fn new(error: PipelineError, events: Vec<StageEvent>) -> Self {
    Self { error, events }
  }
}

impl From<PipelineError> for StageFailure {
  fn from(error: PipelineError) -> Self {
    Self::new(error, Vec::new())
  }
}

/// A failed pipeline run.
///
/// `events` holds every event up to and including the failing stage's, and
/// `last_state` is the state the failing stage was given.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed")]
pub struct RunFailure {
  #[source]
  pub error: PipelineError,
  pub stage: String,
  pub events: Vec<StageEvent>,
  pub last_state: PipelineState,
}
