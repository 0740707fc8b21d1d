//! Pipelines behind the `build`, `deploy` and `destroy` commands.
//!
//! A deploy is the build pipeline (the function list, then one stage per function
//! or one parallel stage) chained with the provisioning pipeline (init, plan, apply, outputs).

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::build::BuildFn;
use crate::consts::PLAN_FILE_NAME;
use crate::context::Context;
use crate::discovery::FunctionSpec;
use crate::pipeline::stages::{self, Approval};
use crate::pipeline::{Pipeline, PipelineState, RunFailure, StageRef, StageResult, parallel};
use crate::provision::{DestroyOption, PlanOption, ProvisionerRef, destroy_preserving};

#[derive(Clone)]
pub struct DeployOptions {
  pub infra_dir: PathBuf,
  pub build_dir: PathBuf,
  /// Prefix for every resource name, passed to the configuration as `namespace = "<ns>-"`.
  pub namespace: Option<String>,
  /// Apply without asking `approval`.
  pub auto_approve: bool,
  pub approval: Option<Approval>,
  pub parallel_builds: bool,
  /// Plan into `<infra_dir>/tfplan` and apply exactly that plan.
  pub save_plan: bool,
  /// Destroy the configuration when the apply fails.
  pub destroy_on_failure: bool,
}

impl fmt::Debug for DeployOptions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DeployOptions")
      .field("infra_dir", &self.infra_dir)
      .field("build_dir", &self.build_dir)
      .field("namespace", &self.namespace)
      .field("auto_approve", &self.auto_approve)
      .field("approval", &self.approval.is_some())
      .field("parallel_builds", &self.parallel_builds)
      .field("save_plan", &self.save_plan)
      .field("destroy_on_failure", &self.destroy_on_failure)
      .finish()
  }
}

impl DeployOptions {
  pub fn new(infra_dir: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
    Self {
      infra_dir: infra_dir.into(),
      build_dir: build_dir.into(),
      namespace: None,
      auto_approve: false,
      approval: None,
      parallel_builds: false,
      save_plan: false,
      destroy_on_failure: false,
    }
  }

  pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
    self.namespace = Some(namespace.into()).filter(|ns: &String| !ns.is_empty());
    self
  }

  pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
    self.auto_approve = auto_approve;
    self
  }

  pub fn with_approval(mut self, approval: Approval) -> Self {
    self.approval = Some(approval);
    self
  }

  pub fn with_parallel_builds(mut self, parallel: bool) -> Self {
    self.parallel_builds = parallel;
    self
  }

  pub fn with_save_plan(mut self, save_plan: bool) -> Self {
    self.save_plan = save_plan;
    self
  }

  pub fn with_destroy_on_failure(mut self, destroy: bool) -> Self {
    self.destroy_on_failure = destroy;
    self
  }

  /// The `namespace` variable value, if a namespace is set.
  fn namespace_var(&self) -> Option<(String, String)> {
    self
      .namespace
      .as_ref()
      .map(|ns| ("namespace".to_string(), format!("{}-", ns)))
  }

  fn plan_file(&self) -> PathBuf {
    self.infra_dir.join(PLAN_FILE_NAME)
  }
}

/// The function list stage, then one build stage per function in declaration
/// order, or a single parallel stage holding them.
pub fn build_pipeline(functions: &[FunctionSpec], builder: BuildFn, options: &DeployOptions) -> Pipeline {
  let builds: Vec<StageRef> = functions
    .iter()
    .map(|function| stages::build_listed(&function.name, builder.clone(), &options.build_dir))
    .collect();

  let mut pipeline = vec![stages::list_functions(functions.to_vec())];
  if options.parallel_builds && builds.len() > 1 {
    pipeline.push(parallel("build", builds));
  } else {
    pipeline.extend(builds);
  }
  Pipeline::new(pipeline)
}

/// Init, plan, apply (only when the plan has changes) and outputs.
pub fn provision_pipeline(prov: ProvisionerRef, options: &DeployOptions) -> Pipeline {
  let mut plan_options = Vec::new();
  if let Some((key, value)) = options.namespace_var() {
    plan_options.push(PlanOption::Var(key, value));
  }
  if options.save_plan {
    plan_options.push(PlanOption::Out(options.plan_file()));
  }

  let approval = if options.auto_approve {
    None
  } else {
    options.approval.clone()
  };

  Pipeline::new(vec![
    stages::init(prov.clone(), &options.infra_dir, vec![]),
    stages::plan(prov.clone(), &options.infra_dir, plan_options),
    stages::apply(prov.clone(), &options.infra_dir, vec![], approval),
    stages::outputs(prov, &options.infra_dir),
  ])
}

pub fn deploy_pipeline(
  functions: &[FunctionSpec],
  builder: BuildFn,
  prov: ProvisionerRef,
  options: &DeployOptions,
) -> Pipeline {
  Pipeline::chain([
    build_pipeline(functions, builder, options),
    provision_pipeline(prov, options),
  ])
}

fn destroy_options(options: &DeployOptions) -> Vec<DestroyOption> {
  let mut destroy_options = vec![DestroyOption::AutoApprove(true)];
  if let Some((key, value)) = options.namespace_var() {
    destroy_options.push(DestroyOption::Var(key, value));
  }
  destroy_options
}

/// Init then destroy. Confirmation is the caller's job; the destroy itself never prompts.
pub fn destroy_pipeline(prov: ProvisionerRef, options: &DeployOptions) -> Pipeline {
  Pipeline::new(vec![
    stages::init(prov.clone(), &options.infra_dir, vec![]),
    stages::destroy(prov, &options.infra_dir, destroy_options(options)),
  ])
}

/// Build and deploy `functions` from `project_dir`.
///
/// With `destroy_on_failure`, a failed apply is followed by a destroy; the apply
/// failure is what gets reported either way.
pub async fn deploy(
  ctx: &Context,
  project_dir: &Path,
  functions: &[FunctionSpec],
  builder: BuildFn,
  prov: ProvisionerRef,
  options: &DeployOptions,
) -> Result<StageResult, RunFailure> {
  let pipeline = deploy_pipeline(functions, builder, prov.clone(), options);
  info!(
    project = %project_dir.display(),
    functions = functions.len(),
    stages = pipeline.len(),
    "deploying"
  );

  let failure = match pipeline.run_with_events(ctx, PipelineState::new(project_dir)).await {
    Ok(result) => return Ok(result),
    Err(failure) => failure,
  };
  let apply_failed = failure.stage == "terraform:apply" && failure.error.provision_error().is_some();
  if !(options.destroy_on_failure && apply_failed) {
    return Err(failure);
  }

  warn!(stage = %failure.stage, "apply failed, destroying");
  // Cleanup gets its own context so it still runs after a cancelled apply.
  let failure = destroy_preserving(
    prov.as_ref(),
    &Context::new(),
    &options.infra_dir,
    destroy_options(options),
    failure,
  )
  .await;
  Err(failure)
}
