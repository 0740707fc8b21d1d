use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::pipeline::{PipelineError, StageEvent, StageFailure, StageRef, StageResult, event_stage_fn};
use crate::provision::{
  ApplyOption, DestroyOption, InitOption, Operation, PlanOption, ProvisionError, ProvisionerRef, resolve,
};

/// Asked once before an apply that has changes. Returning `false` declines the deployment.
///
/// Runs on a blocking thread, so it may read from a terminal.
pub type Approval = Arc<dyn Fn() -> bool + Send + Sync>;

/// What [`plan`] leaves in the config slot for [`apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
  pub has_changes: bool,
  /// The saved plan, when the plan was written to a file.
  pub plan_file: Option<PathBuf>,
}

fn failed(op: Operation, e: ProvisionError, events: Vec<StageEvent>) -> StageFailure {
  StageFailure::new(PipelineError::provision(op, e), events)
}

pub fn init(prov: ProvisionerRef, dir: impl Into<PathBuf>, options: Vec<InitOption>) -> StageRef {
  let dir: PathBuf = dir.into();
  event_stage_fn("terraform:init", move |ctx, state| {
    let prov = Arc::clone(&prov);
    let dir = dir.clone();
    let options = options.clone();
    async move {
      let mut events = vec![StageEvent::info("==> Initializing Terraform...")];
      if let Err(e) = prov.init(&ctx, &dir, options).await {
        return Err(failed(Operation::Init, e, events));
      }
      events.push(StageEvent::success("[terraform] Initialized"));
      Ok(StageResult::new(state, events))
    }
  })
}

pub fn validate(prov: ProvisionerRef, dir: impl Into<PathBuf>) -> StageRef {
  let dir: PathBuf = dir.into();
  event_stage_fn("terraform:validate", move |ctx, state| {
    let prov = Arc::clone(&prov);
    let dir = dir.clone();
    async move {
      let mut events = vec![StageEvent::info("==> Validating configuration...")];
      if let Err(e) = prov.validate(&ctx, &dir).await {
        return Err(failed(Operation::Validate, e, events));
      }
      events.push(StageEvent::success("[terraform] Configuration is valid"));
      Ok(StageResult::new(state, events))
    }
  })
}

/// Plan and store a [`PlanOutcome`] in the config slot.
///
/// A `namespace` variable is announced as the deployment namespace.
pub fn plan(prov: ProvisionerRef, dir: impl Into<PathBuf>, options: Vec<PlanOption>) -> StageRef {
  let dir: PathBuf = dir.into();
  event_stage_fn("terraform:plan", move |ctx, state| {
    let prov = Arc::clone(&prov);
    let dir = dir.clone();
    let options = options.clone();
    async move {
      let resolved = resolve(options.clone());
      let mut events = vec![StageEvent::info("==> Planning infrastructure changes...")];
      if let Some(namespace) = resolved.vars.get("namespace") {
        events.push(StageEvent::info(format!(
          "Deploying to namespace: {}",
          namespace.trim_end_matches('-')
        )));
      }

      let has_changes = match prov.plan(&ctx, &dir, options).await {
        Ok(has_changes) => has_changes,
        Err(e) => return Err(failed(Operation::Plan, e, events)),
      };
      events.push(if has_changes {
        StageEvent::info("[terraform] Changes detected")
      } else {
        StageEvent::success("[terraform] No changes detected")
      });

      let outcome = PlanOutcome {
        has_changes,
        plan_file: resolved.out,
      };
      Ok(StageResult::new(state.with_config(outcome), events))
    }
  })
}

/// Apply the changes found by the preceding [`plan`] stage.
///
/// Skipped when the plan found nothing. Otherwise `approval` (if any) is asked first,
/// then the apply runs non-interactively, using the saved plan file when there is one.
pub fn apply(
  prov: ProvisionerRef,
  dir: impl Into<PathBuf>,
  options: Vec<ApplyOption>,
  approval: Option<Approval>,
) -> StageRef {
  let dir: PathBuf = dir.into();
  event_stage_fn("terraform:apply", move |ctx, state| {
    let prov = Arc::clone(&prov);
    let dir = dir.clone();
    let mut options = options.clone();
    let approval = approval.clone();
    async move {
      let outcome = state.config::<PlanOutcome>()?.clone();
      if !outcome.has_changes {
        info!(dir = %dir.display(), "no changes, skipping apply");
        return Ok(StageResult::new(state, vec![StageEvent::info("No changes to apply")]));
      }

      if let Some(approve) = approval {
        let approved = tokio::task::spawn_blocking(move || approve())
          .await
          .map_err(|e| PipelineError::Aborted {
            stage: "terraform:apply".into(),
            message: e.to_string(),
          })?;
        if !approved {
          return Err(PipelineError::Declined.into());
        }
      }

      options.push(ApplyOption::AutoApprove(true));
      if let Some(plan_file) = outcome.plan_file {
        options.push(ApplyOption::PlanFile(plan_file));
      }

      let mut events = vec![StageEvent::info("==> Applying infrastructure changes...")];
      if let Err(e) = prov.apply(&ctx, &dir, options).await {
        return Err(failed(Operation::Apply, e, events));
      }
      events.push(StageEvent::success("[terraform] Applied successfully"));
      Ok(StageResult::new(state, events))
    }
  })
}

/// Read outputs into the state. A failure here only produces a warning.
pub fn outputs(prov: ProvisionerRef, dir: impl Into<PathBuf>) -> StageRef {
  let dir: PathBuf = dir.into();
  event_stage_fn("terraform:output", move |ctx, state| {
    let prov = Arc::clone(&prov);
    let dir = dir.clone();
    async move {
      match prov.outputs(&ctx, &dir).await {
        Ok(values) => {
          let event = StageEvent::info(format!("Captured {} output(s)", values.len()));
          Ok::<_, StageFailure>(StageResult::new(state.with_outputs(values), vec![event]))
        }
        Err(e) => {
          warn!(error = %e, "reading outputs failed");
          let event = StageEvent::warning(format!("Failed to retrieve outputs: {}", e));
          Ok(StageResult::new(state, vec![event]))
        }
      }
    }
  })
}

pub fn destroy(prov: ProvisionerRef, dir: impl Into<PathBuf>, options: Vec<DestroyOption>) -> StageRef {
  let dir: PathBuf = dir.into();
  event_stage_fn("terraform:destroy", move |ctx, state| {
    let prov = Arc::clone(&prov);
    let dir = dir.clone();
    let options = options.clone();
    async move {
      let mut events = vec![StageEvent::info("==> Destroying infrastructure...")];
      if let Err(e) = prov.destroy(&ctx, &dir, options).await {
        return Err(failed(Operation::Destroy, e, events));
      }
      events.push(StageEvent::success("[terraform] Destroyed"));
      Ok(StageResult::new(state.with_outputs(Default::default()), events))
    }
  })
}
