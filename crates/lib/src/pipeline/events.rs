use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PipelineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
  Info,
  Success,
  Warning,
  Error,
}

/// A progress message produced by a stage. Events are for presentation only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
  pub level: EventLevel,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
}

impl StageEvent {
  pub fn new(level: EventLevel, message: impl Into<String>) -> Self {
    Self {
      level,
      message: message.into(),
      data: None,
    }
  }

  pub fn info(message: impl Into<String>) -> Self {
    Self::new(EventLevel::Info, message)
  }

  pub fn success(message: impl Into<String>) -> Self {
    Self::new(EventLevel::Success, message)
  }

  pub fn warning(message: impl Into<String>) -> Self {
    Self::new(EventLevel::Warning, message)
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self::new(EventLevel::Error, message)
  }

  pub fn with_data(mut self, data: Value) -> Self {
    self.data = Some(data);
    self
  }
}

/// A stage's successful outcome: the next state and the events emitted on the way.
#[derive(Debug, Clone)]
pub struct StageResult {
  pub state: PipelineState,
  pub events: Vec<StageEvent>,
}

impl StageResult {
  pub fn new(state: PipelineState, events: Vec<StageEvent>) -> Self {
    Self { state, events }
  }

  /// A result carrying no events.
  pub fn quiet(state: PipelineState) -> Self {
    Self::new(state, Vec::new())
  }
}
