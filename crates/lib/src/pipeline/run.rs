use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{PipelineError, PipelineState, RunFailure, Stage, StageEvent, StageFailure, StageRef, StageResult};
use crate::context::Context;

/// An ordered list of stages run one after another, stopping at the first failure.
#[derive(Clone, Default)]
pub struct Pipeline {
  stages: Vec<StageRef>,
}

impl fmt::Debug for Pipeline {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.stages.iter().map(|s| s.name())).finish()
  }
}

impl Pipeline {
  pub fn new(stages: Vec<StageRef>) -> Self {
    Self { stages }
  }

  pub fn then(mut self, stage: StageRef) -> Self {
    self.stages.push(stage);
    self
  }

  /// Concatenate pipelines into one, preserving order.
  pub fn chain(pipelines: impl IntoIterator<Item = Pipeline>) -> Self {
    Self {
      stages: pipelines.into_iter().flat_map(|p| p.stages).collect(),
    }
  }

  pub fn len(&self) -> usize {
    self.stages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }

  pub fn stage_names(&self) -> Vec<&str> {
    self.stages.iter().map(|s| s.name()).collect()
  }

  /// Run all stages and return only the final state.
  pub async fn run(&self, ctx: &Context, initial: PipelineState) -> Result<PipelineState, PipelineError> {
    self
      .run_with_events(ctx, initial)
      .await
      .map(|result| result.state)
      .map_err(|failure| failure.error)
  }

  /// Run all stages, collecting every event in stage order.
  ///
  /// The context is checked before each stage; a cancelled context stops the run
  /// with `PipelineError::Cancelled` without starting the next stage.
  pub async fn run_with_events(&self, ctx: &Context, initial: PipelineState) -> Result<StageResult, RunFailure> {
    let mut events: Vec<StageEvent> = Vec::new();
    let mut state = initial;

    for stage in &self.stages {
      if ctx.is_cancelled() {
        warn!(stage = stage.name(), "cancelled before stage");
        return Err(RunFailure {
          error: PipelineError::Cancelled,
          stage: stage.name().to_string(),
          events,
          last_state: state,
        });
      }

      debug!(stage = stage.name(), "running stage");
      match stage.run(ctx, state.clone()).await {
        Ok(result) => {
          events.extend(result.events);
          state = result.state;
        }
        Err(failure) => {
          warn!(stage = stage.name(), error = %failure.error, "stage failed");
          events.extend(failure.events);
          return Err(RunFailure {
            error: failure.error,
            stage: stage.name().to_string(),
            events,
            last_state: state,
          });
        }
      }
    }

    Ok(StageResult::new(state, events))
  }
}

struct Sequential {
  name: String,
  pipeline: Pipeline,
}

#[async_trait]
impl Stage for Sequential {
  fn name(&self) -> &str {
    &self.name
  }

  async fn run(&self, ctx: &Context, state: PipelineState) -> Result<StageResult, StageFailure> {
    self
      .pipeline
      .run_with_events(ctx, state)
      .await
      .map_err(|failure| StageFailure::new(failure.error, failure.events))
  }
}

/// Group `stages` into a single stage that runs them in order.
pub fn sequential(name: impl Into<String>, stages: Vec<StageRef>) -> StageRef {
  Arc::new(Sequential {
    name: name.into(),
    pipeline: Pipeline::new(stages),
  })
}
