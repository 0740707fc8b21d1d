//! Implementation of the `forge build` command.

use std::time::Instant;

use anyhow::Result;
use tracing::info;

use forge_lib::deploy::{DeployOptions, build_pipeline};
use forge_lib::pipeline::PipelineState;

use super::{Global, Project, block_on, report};
use crate::output::{format_bytes, format_duration, print_stat, print_success, print_warning};

pub fn cmd_build(global: &Global, parallel: bool) -> Result<()> {
  let project = Project::load(&global.project)?;
  let functions = project.config.functions(&project.dir);
  if functions.is_empty() {
    print_warning("No functions declared in forge.toml");
    return Ok(());
  }

  let options = DeployOptions::new(project.config.infra_dir(&project.dir), project.build_dir())
    .with_parallel_builds(parallel || project.config.build.parallel);
  let pipeline = build_pipeline(&functions, project.builder(), &options);
  info!(functions = functions.len(), parallel = options.parallel_builds, "building");

  let started = Instant::now();
  let outcome = block_on(global.timeout, |ctx| async move {
    pipeline.run_with_events(&ctx, PipelineState::new(&project.dir)).await
  })?;

  report(global.output, outcome, |result| {
    println!();
    print_success(&format!(
      "Built {} function(s) in {}",
      result.state.artifacts().len(),
      format_duration(started.elapsed())
    ));
    for (name, artifact) in result.state.artifacts() {
      print_stat(name, &format!("{} ({})", artifact.path.display(), format_bytes(artifact.size)));
    }
  })
}
