use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use crate::build::{Artifact, BuildConfig, BuildError, BuildFn};
use crate::discovery::FunctionSpec;
use crate::pipeline::{PipelineError, Stage, StageEvent, StageFailure, StageRef, StageResult, event_stage_fn};

fn built_event(function: &str, artifact: &Artifact) -> StageEvent {
  StageEvent::success(format!(
    "[{}] Built: {} ({:.2} MB)",
    function,
    artifact.file_name(),
    artifact.size_mb()
  ))
  .with_data(json!({
    "function": function,
    "path": artifact.path,
    "checksum": artifact.checksum,
    "size": artifact.size,
  }))
}

/// Build one function and record its artifact under `function`.
pub fn build_function(function: impl Into<String>, config: BuildConfig, builder: BuildFn) -> StageRef {
  let function: String = function.into();
  let config = Arc::new(config);
  event_stage_fn(format!("build:{}", function), move |ctx, state| {
    let function = function.clone();
    let config = Arc::clone(&config);
    let builder = Arc::clone(&builder);
    async move {
      let mut events = vec![StageEvent::info(format!("[{}] Building...", function))];
      match builder.build(&ctx, &config).await {
        Ok(artifact) => {
          events.push(built_event(&function, &artifact));
          Ok(StageResult::new(state.with_artifact(function, artifact), events))
        }
        Err(e) => Err(StageFailure::new(PipelineError::build(function, e), events)),
      }
    }
  })
}

/// Put `functions` into the config slot for [`build_listed`].
pub fn list_functions(functions: Vec<FunctionSpec>) -> StageRef {
  let functions = Arc::new(functions);
  event_stage_fn("functions", move |_ctx, state| {
    let functions = Arc::clone(&functions);
    async move {
      let mut events = vec![StageEvent::info(format!("Found {} function(s):", functions.len()))];
      events.extend(
        functions
          .iter()
          .map(|f| StageEvent::info(format!("  - {} ({})", f.name, f.runtime))),
      );
      Ok::<_, StageFailure>(StageResult::new(state.with_config(functions.to_vec()), events))
    }
  })
}

/// Build `function` as described by the function list in the config slot.
///
/// The stage is named `build:<function>` like [`build_function`], and its artifact
/// lands in `build_dir`. A function missing from the list fails the build.
pub fn build_listed(function: impl Into<String>, builder: BuildFn, build_dir: impl Into<PathBuf>) -> StageRef {
  let function: String = function.into();
  let build_dir: PathBuf = build_dir.into();
  event_stage_fn(format!("build:{}", function), move |ctx, state| {
    let function = function.clone();
    let builder = Arc::clone(&builder);
    let build_dir = build_dir.clone();
    async move {
      let config = state
        .config::<Vec<FunctionSpec>>()?
        .iter()
        .find(|spec| spec.name == function)
        .ok_or_else(|| BuildError::InvalidConfig(format!("function '{}' is not in the function list", function)))
        .and_then(|spec| {
          debug!(function = %spec.name, runtime = %spec.runtime, "building listed function");
          spec.to_build_config(&build_dir)
        });
      match config {
        Ok(config) => {
          let stage = build_function(function, config, builder);
          stage.run(&ctx, state).await
        }
        Err(e) => {
          let events = vec![StageEvent::info(format!("[{}] Building...", function))];
          Err(StageFailure::new(PipelineError::build(function, e), events))
        }
      }
    }
  })
}
