use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::{PipelineError, PipelineState, StageFailure, StageResult};
use crate::context::Context;

/// One step of a pipeline.
///
/// A stage takes the current state by value and returns the next one with any events
/// it produced. On failure it returns the events emitted before the failure.
#[async_trait]
pub trait Stage: Send + Sync {
  fn name(&self) -> &str;

  async fn run(&self, ctx: &Context, state: PipelineState) -> Result<StageResult, StageFailure>;
}

pub type StageRef = Arc<dyn Stage>;

struct FnStage<F> {
  name: String,
  f: F,
}

#[async_trait]
impl<F, Fut> Stage for FnStage<F>
where
  F: Fn(Context, PipelineState) -> Fut + Send + Sync,
  Fut: Future<Output = Result<PipelineState, PipelineError>> + Send,
{
  fn name(&self) -> &str {
    &self.name
  }

  async fn run(&self, ctx: &Context, state: PipelineState) -> Result<StageResult, StageFailure> {
    let state = (self.f)(ctx.clone(), state).await?;
    Ok(StageResult::quiet(state))
  }
}

struct EventFnStage<F> {
  name: String,
  f: F,
}

#[async_trait]
impl<F, Fut> Stage for EventFnStage<F>
where
  F: Fn(Context, PipelineState) -> Fut + Send + Sync,
  Fut: Future<Output = Result<StageResult, StageFailure>> + Send,
{
  fn name(&self) -> &str {
    &self.name
  }

  async fn run(&self, ctx: &Context, state: PipelineState) -> Result<StageResult, StageFailure> {
    (self.f)(ctx.clone(), state).await
  }
}

/// A stage from an async closure that only transforms state.
pub fn stage_fn<F, Fut>(name: impl Into<String>, f: F) -> StageRef
where
  F: Fn(Context, PipelineState) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<PipelineState, PipelineError>> + Send + 'static,
{
  Arc::new(FnStage { name: name.into(), f })
}

/// A stage from an async closure that also reports events.
pub fn event_stage_fn<F, Fut>(name: impl Into<String>, f: F) -> StageRef
where
  F: Fn(Context, PipelineState) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<StageResult, StageFailure>> + Send + 'static,
{
  Arc::new(EventFnStage { name: name.into(), f })
}
