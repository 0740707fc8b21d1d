//! Implementation of the `forge outputs` command.

use anyhow::{Context as _, Result};

use forge_lib::provision::Provisioner as _;

use crate::output::{print_info, print_json, print_stat};

use super::{Global, Project, block_on};

pub fn cmd_outputs(global: &Global) -> Result<()> {
  let project = Project::load(&global.project)?;
  let infra_dir = project.infra_dir()?;
  let prov = project.provisioner();

  let outputs = block_on(global.timeout, |ctx| async move { prov.outputs(&ctx, &infra_dir).await })?
    .context("Failed to read outputs")?;

  if global.output.is_json() {
    return print_json(&outputs);
  }
  if outputs.is_empty() {
    print_info("No outputs");
    return Ok(());
  }
  for (name, value) in &outputs {
    let rendered = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
    print_stat(name, &rendered);
  }
  Ok(())
}
