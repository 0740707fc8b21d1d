//! Implementation of the `forge deploy` command.
//!
//! Builds every declared function, then runs init, plan and apply against the
//! infrastructure directory. Outputs are printed once the apply succeeds.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, bail};

use forge_lib::deploy::{DeployOptions, deploy};
use forge_lib::pipeline::stages::Approval;

use super::{Global, Project, block_on, report};
use crate::output::{format_duration, print_info, print_stat, print_success};
use crate::prompts::{confirm, is_interactive};

pub struct DeployArgs {
  pub namespace: Option<String>,
  pub auto_approve: bool,
  pub parallel: bool,
  pub save_plan: bool,
  pub destroy_on_failure: bool,
}

pub fn cmd_deploy(global: &Global, args: DeployArgs) -> Result<()> {
  let project = Project::load(&global.project)?;
  let infra_dir = project.infra_dir()?;
  if !args.auto_approve && !is_interactive() {
    bail!("Cannot prompt for confirmation in non-interactive mode. Use --auto-approve to proceed.");
  }

  let functions = project.config.functions(&project.dir);
  if functions.is_empty() {
    print_info("No functions declared in forge.toml, deploying infrastructure only");
  }

  let approval: Approval = Arc::new(|| confirm("Apply these changes?", false).unwrap_or(false));
  let mut options = DeployOptions::new(infra_dir, project.build_dir())
    .with_auto_approve(args.auto_approve)
    .with_approval(approval)
    .with_parallel_builds(args.parallel || project.config.build.parallel)
    .with_save_plan(args.save_plan)
    .with_destroy_on_failure(args.destroy_on_failure);
  if let Some(namespace) = args.namespace {
    options = options.with_namespace(namespace);
  }

  let builder = project.builder();
  let prov = project.provisioner();
  let started = Instant::now();
  let outcome = block_on(global.timeout, |ctx| async move {
    deploy(&ctx, &project.dir, &functions, builder, prov, &options).await
  })?;

  report(global.output, outcome, |result| {
    println!();
    print_success(&format!("Deployment complete in {}", format_duration(started.elapsed())));
    if !result.state.outputs().is_empty() {
      println!();
      println!("Outputs:");
      for (name, value) in result.state.outputs() {
        let rendered = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
        print_stat(name, &rendered);
      }
    }
  })
}
