use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::{PipelineError, PipelineState, Stage, StageEvent, StageFailure, StageRef, StageResult};
use crate::context::Context;

struct Parallel {
  name: String,
  branches: Vec<StageRef>,
}

/// Events of the branches that already finished, in declaration order.
fn finished_events(finished: &[Option<StageResult>]) -> Vec<StageEvent> {
  finished
    .iter()
    .flatten()
    .flat_map(|result| result.events.iter().cloned())
    .collect()
}

#[async_trait]
impl Stage for Parallel {
  fn name(&self) -> &str {
    &self.name
  }

  /// Every branch gets its own copy of the input state and runs as a separate task.
  /// The first failure aborts the remaining branches and becomes the stage's failure.
  async fn run(&self, ctx: &Context, state: PipelineState) -> Result<StageResult, StageFailure> {
    ctx.check().map_err(PipelineError::from)?;

    let mut tasks = JoinSet::new();
    for (index, branch) in self.branches.iter().enumerate() {
      let branch = Arc::clone(branch);
      let ctx = ctx.clone();
      let input = state.clone();
      tasks.spawn(async move {
        debug!(branch = branch.name(), "starting branch");
        (index, branch.run(&ctx, input).await)
      });
    }

    let mut finished: Vec<Option<StageResult>> = vec![None; self.branches.len()];
    while let Some(joined) = tasks.join_next().await {
      let (index, outcome) = match joined {
        Ok(pair) => pair,
        Err(e) => {
          tasks.abort_all();
          let error = PipelineError::Aborted {
            stage: self.name.clone(),
            message: e.to_string(),
          };
          return Err(StageFailure::new(error, finished_events(&finished)));
        }
      };

      match outcome {
        Ok(result) => finished[index] = Some(result),
        Err(failure) => {
          tasks.abort_all();
          warn!(
            stage = %self.name,
            branch = self.branches[index].name(),
            error = %failure.error,
            "branch failed, aborting the others"
          );
          let mut events = finished_events(&finished);
          events.extend(failure.events);
          return Err(StageFailure::new(failure.error, events));
        }
      }
    }

    let mut events = Vec::new();
    let mut branch_states = Vec::with_capacity(finished.len());
    for result in finished.into_iter().flatten() {
      events.extend(result.events);
      branch_states.push(result.state);
    }
    match PipelineState::merge_branches(&state, branch_states) {
      Ok(merged) => Ok(StageResult::new(merged, events)),
      Err(e) => Err(StageFailure::new(e, events)),
    }
  }
}

/// Run `branches` concurrently as one stage and merge their results.
///
/// Branch events appear in declaration order regardless of completion order.
pub fn parallel(name: impl Into<String>, branches: Vec<StageRef>) -> StageRef {
  Arc::new(Parallel {
    name: name.into(),
    branches,
  })
}
