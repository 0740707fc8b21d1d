//! End-to-end pipeline runs with real builders and an in-memory provisioner.

use std::sync::Arc;

use forge_lib::Context;
use forge_lib::build::{BuildCache, BuildFn, Registry, compose, with_cache, with_logging};
use forge_lib::deploy::{DeployOptions, deploy, deploy_pipeline};
use forge_lib::discovery::FunctionSpec;
use forge_lib::pipeline::{EventLevel, PipelineError, PipelineState};
use forge_lib::provision::{FakeProvisioner, Operation};
use serde_json::json;
use tempfile::TempDir;

use super::common::{write_file, zip_entry_names};

struct Project {
  temp: TempDir,
}

impl Project {
  /// `api` is a Python function that needs no toolchain; `worker` is a Java function
  /// without a `pom.xml`, so its build always fails.
  fn new() -> Self {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "src/functions/api/handler.py", "def handler(event, ctx):\n    return 200\n");
    write_file(temp.path(), "src/functions/api/lib/util.py", "X = 1\n");
    write_file(temp.path(), "src/functions/worker/src/Main.java", "class Main {}\n");
    Self { temp }
  }

  fn api(&self) -> FunctionSpec {
    FunctionSpec::new("api", "python3.12", self.temp.path().join("src/functions/api"))
  }

  fn worker(&self) -> FunctionSpec {
    FunctionSpec::new("worker", "java21", self.temp.path().join("src/functions/worker"))
  }

  fn options(&self) -> DeployOptions {
    DeployOptions::new(self.temp.path().join("infra"), self.temp.path().join(".forge/build")).with_auto_approve(true)
  }
}

fn registry() -> BuildFn {
  Arc::new(Registry::with_defaults())
}

#[tokio::test]
async fn failing_build_stops_before_provisioning() {
  let project = Project::new();
  let prov = Arc::new(FakeProvisioner::new());
  let pipeline = deploy_pipeline(&[project.api(), project.worker()], registry(), prov.clone(), &project.options());

  assert_eq!(pipeline.len(), 7);

  let failure = pipeline
    .run_with_events(&Context::new(), PipelineState::new(project.temp.path()))
    .await
    .unwrap_err();

  assert_eq!(failure.stage, "build:worker");
  assert!(matches!(failure.error, PipelineError::Build { ref function, .. } if function == "worker"));
  assert!(failure.error.to_string().contains("pom.xml not found"));

  let api = failure.last_state.artifact("api").expect("api artifact recorded");
  assert!(api.path.is_file());
  assert_eq!(api.path, project.temp.path().join(".forge/build/api.zip"));
  assert_eq!(zip_entry_names(&api.path), vec!["handler.py", "lib/util.py"]);
  assert!(failure.last_state.artifact("worker").is_none());
  assert!(!project.temp.path().join(".forge/build/worker.jar").exists());

  assert!(prov.calls().is_empty());

  let messages: Vec<_> = failure.events.iter().map(|e| e.message.as_str()).collect();
  assert_eq!(&messages[..4], ["Found 2 function(s):", "  - api (python3.12)", "  - worker (java21)", "[api] Building..."]);
  assert!(messages[4].starts_with("[api] Built: api.zip"));
  assert_eq!(messages[5], "[worker] Building...");
  assert_eq!(messages.len(), 6);
}

#[tokio::test]
async fn successful_deploy_collects_artifacts_outputs_and_events() {
  let project = Project::new();
  let prov = Arc::new(FakeProvisioner::new().with_output("api_url", json!("https://example.test")));

  let result = deploy(
    &Context::new(),
    project.temp.path(),
    &[project.api()],
    registry(),
    prov.clone(),
    &project.options(),
  )
  .await
  .unwrap();

  assert_eq!(result.state.artifacts().len(), 1);
  assert_eq!(result.state.output("api_url"), Some(&json!("https://example.test")));
  assert_eq!(
    prov.operations(),
    vec![Operation::Init, Operation::Plan, Operation::Apply, Operation::Output]
  );
  assert!(result.events.iter().all(|e| e.level != EventLevel::Error));
  assert_eq!(result.events.last().unwrap().message, "Captured 1 output(s)");
}

#[tokio::test]
async fn redeploy_without_changes_skips_apply() {
  let project = Project::new();
  let prov = Arc::new(FakeProvisioner::new());
  let options = project.options();

  for _ in 0..2 {
    deploy(
      &Context::new(),
      project.temp.path(),
      &[project.api()],
      registry(),
      prov.clone(),
      &options,
    )
    .await
    .unwrap();
  }

  let applies = prov.operations().iter().filter(|op| **op == Operation::Apply).count();
  assert_eq!(applies, 1);
}

#[tokio::test]
async fn cached_registry_builds_each_function_once() {
  let project = Project::new();
  let cache = Arc::new(BuildCache::new());
  let decorate = compose(vec![with_logging(), with_cache(cache.clone())]);
  let builder = decorate(registry());
  let prov = Arc::new(FakeProvisioner::new());

  let first = deploy(
    &Context::new(),
    project.temp.path(),
    &[project.api()],
    builder.clone(),
    prov.clone(),
    &project.options(),
  )
  .await
  .unwrap();
  let second = deploy(
    &Context::new(),
    project.temp.path(),
    &[project.api()],
    builder,
    prov,
    &project.options(),
  )
  .await
  .unwrap();

  assert_eq!(first.state.artifact("api"), second.state.artifact("api"));
  assert_eq!(cache.misses(), 1);
  assert_eq!(cache.hits(), 1);
}

#[tokio::test]
async fn parallel_builds_report_the_failing_function() {
  let project = Project::new();
  let prov = Arc::new(FakeProvisioner::new());
  let options = project.options().with_parallel_builds(true);

  let failure = deploy(
    &Context::new(),
    project.temp.path(),
    &[project.api(), project.worker()],
    registry(),
    prov.clone(),
    &options,
  )
  .await
  .unwrap_err();

  assert_eq!(failure.stage, "build");
  assert!(matches!(failure.error, PipelineError::Build { ref function, .. } if function == "worker"));
  assert!(prov.calls().is_empty());
}

#[tokio::test]
async fn cancelled_context_runs_nothing() {
  let project = Project::new();
  let prov = Arc::new(FakeProvisioner::new());
  let ctx = Context::new();
  ctx.cancel();

  let failure = deploy(&ctx, project.temp.path(), &[project.api()], registry(), prov.clone(), &project.options())
    .await
    .unwrap_err();

  assert!(failure.error.is_cancelled());
  assert_eq!(failure.stage, "functions");
  assert!(!project.temp.path().join(".forge/build/api.zip").exists());
  assert!(prov.calls().is_empty());
}
