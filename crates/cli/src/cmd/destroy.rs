//! Implementation of the `forge destroy` command.

use anyhow::Result;

use forge_lib::deploy::{DeployOptions, destroy_pipeline};
use forge_lib::pipeline::PipelineState;

use super::{Global, Project, block_on, report};
use crate::output::{print_info, print_success};
use crate::prompts::confirm;

pub fn cmd_destroy(global: &Global, namespace: Option<String>, auto_approve: bool) -> Result<()> {
  let project = Project::load(&global.project)?;
  let infra_dir = project.infra_dir()?;

  let target = match &namespace {
    Some(ns) => format!("all infrastructure in namespace '{}'", ns),
    None => "all infrastructure".to_string(),
  };
  if !confirm(&format!("This will destroy {}. Continue?", target), auto_approve)? {
    print_info("Destroy cancelled");
    return Ok(());
  }

  let mut options = DeployOptions::new(infra_dir, project.build_dir());
  if let Some(namespace) = namespace {
    options = options.with_namespace(namespace);
  }
  let pipeline = destroy_pipeline(project.provisioner(), &options);

  let outcome = block_on(global.timeout, |ctx| async move {
    pipeline.run_with_events(&ctx, PipelineState::new(&project.dir)).await
  })?;

  report(global.output, outcome, |_| {
    println!();
    print_success("Destroy complete");
  })
}
