//! Implementation of the `forge validate` command.

use anyhow::Result;

use forge_lib::pipeline::{Pipeline, PipelineState, stages};
use forge_lib::provision::InitOption;

use super::{Global, Project, block_on, report};

/// Initialise without a backend and validate the configuration.
pub fn cmd_validate(global: &Global) -> Result<()> {
  let project = Project::load(&global.project)?;
  let infra_dir = project.infra_dir()?;
  let prov = project.provisioner();

  let pipeline = Pipeline::new(vec![
    stages::init(prov.clone(), &infra_dir, vec![InitOption::Backend(false)]),
    stages::validate(prov, &infra_dir),
  ]);

  let outcome = block_on(global.timeout, |ctx| async move {
    pipeline.run_with_events(&ctx, PipelineState::new(&project.dir)).await
  })?;

  report(global.output, outcome, |_| {})
}
