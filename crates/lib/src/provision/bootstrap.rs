//! Composite provisioning flows.

use std::fmt::Display;
use std::path::Path;

use tracing::{info, warn};

use super::{ApplyOption, DestroyOption, InitOption, PlanOption, ProvisionError, Provisioner};
use crate::consts::PLAN_FILE_NAME;
use crate::context::Context;

/// Init, plan to a saved plan file, and apply that plan only when it has changes.
///
/// Returns whether anything was applied.
pub async fn apply_bootstrap(prov: &dyn Provisioner, ctx: &Context, dir: &Path) -> Result<bool, ProvisionError> {
  prov.init(ctx, dir, vec![InitOption::Upgrade(false)]).await?;

  let plan_file = dir.join(PLAN_FILE_NAME);
  let has_changes = prov.plan(ctx, dir, vec![PlanOption::Out(plan_file.clone())]).await?;
  if !has_changes {
    info!(dir = %dir.display(), "bootstrap infrastructure up to date");
    return Ok(false);
  }

  prov
    .apply(
      ctx,
      dir,
      vec![ApplyOption::AutoApprove(true), ApplyOption::PlanFile(plan_file)],
    )
    .await?;
  info!(dir = %dir.display(), "bootstrap infrastructure applied");
  Ok(true)
}

/// Destroy during unwind after `original` failed.
///
/// Always returns `original`; a destroy failure is logged and never replaces it.
pub async fn destroy_preserving<E: Display>(
  prov: &dyn Provisioner,
  ctx: &Context,
  dir: &Path,
  options: Vec<DestroyOption>,
  original: E,
) -> E {
  warn!(error = %original, dir = %dir.display(), "destroying after failure");
  if let Err(e) = prov.destroy(ctx, dir, options).await {
    warn!(error = %e, original = %original, "cleanup destroy failed, keeping original error");
  }
  original
}
