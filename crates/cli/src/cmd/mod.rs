mod build;
mod deploy;
mod destroy;
mod outputs;
mod validate;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use forge_lib::Context;
use forge_lib::build::{Artifact, BuildFn, Registry, compose, with_logging};
use forge_lib::config::ForgeConfig;
use forge_lib::pipeline::{RunFailure, StageEvent, StageResult};
use forge_lib::provision::{ProvisionerRef, TerraformCli};

use crate::output::{OutputFormat, print_events, print_json};

pub use build::cmd_build;
pub use deploy::{DeployArgs, cmd_deploy};
pub use destroy::cmd_destroy;
pub use outputs::cmd_outputs;
pub use validate::cmd_validate;

/// Flags shared by every command.
pub struct Global {
  pub project: PathBuf,
  pub output: OutputFormat,
  pub timeout: Option<Duration>,
}

/// A loaded project: its root and `forge.toml`.
pub struct Project {
  pub dir: PathBuf,
  pub config: ForgeConfig,
}

impl Project {
  pub fn load(dir: &Path) -> Result<Self> {
    let dir = dunce::canonicalize(dir).with_context(|| format!("Project directory not found: {}", dir.display()))?;
    let config = ForgeConfig::load(&dir).context("Failed to load project configuration")?;
    Ok(Self { dir, config })
  }

  pub fn build_dir(&self) -> PathBuf {
    self.config.build_dir(&self.dir)
  }

  /// The infrastructure directory, which must exist.
  pub fn infra_dir(&self) -> Result<PathBuf> {
    let dir = self.config.infra_dir(&self.dir);
    if !dir.is_dir() {
      bail!("Infrastructure directory not found: {}", dir.display());
    }
    Ok(dir)
  }

  pub fn provisioner(&self) -> ProvisionerRef {
    let mut cli = TerraformCli::new(&self.config.terraform.binary);
    if let Some(region) = &self.config.project.region {
      cli = cli.with_env("AWS_REGION", region);
    }
    Arc::new(cli)
  }

  pub fn builder(&self) -> BuildFn {
    let registry: BuildFn = Arc::new(Registry::with_defaults());
    let decorate = compose(vec![with_logging()]);
    decorate(registry)
  }
}

/// Run `f` on a fresh runtime with a context cancelled by Ctrl-C or the `--timeout`.
pub fn block_on<F, Fut, T>(timeout: Option<Duration>, f: F) -> Result<T>
where
  F: FnOnce(Context) -> Fut,
  Fut: Future<Output = T>,
{
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let ctx = Context::new();

  Ok(rt.block_on(async {
    let interrupt = {
      let ctx = ctx.clone();
      tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
          warn!("interrupted, cancelling");
          ctx.cancel();
        }
      })
    };
    let timer = timeout.map(|after| ctx.cancel_after(after));

    let result = f(ctx.clone()).await;

    interrupt.abort();
    if let Some(timer) = timer {
      timer.abort();
    }
    result
  }))
}

#[derive(Serialize)]
struct RunReport<'a> {
  success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  failed_stage: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  error: Option<String>,
  artifacts: Vec<&'a Artifact>,
  outputs: &'a std::collections::BTreeMap<String, Value>,
  events: &'a [StageEvent],
}

/// Print a pipeline run and turn a failure into the command's error.
///
/// In text mode the events are printed line by line and `summary` runs on success.
/// In JSON mode a single report object is printed either way.
pub fn report(output: OutputFormat, outcome: Result<StageResult, RunFailure>, summary: impl FnOnce(&StageResult)) -> Result<()> {
  match outcome {
    Ok(result) => {
      if output.is_json() {
        print_json(&RunReport {
          success: true,
          failed_stage: None,
          error: None,
          artifacts: result.state.artifacts().values().collect(),
          outputs: result.state.outputs(),
          events: &result.events,
        })?;
      } else {
        print_events(&result.events);
        summary(&result);
      }
      Ok(())
    }
    Err(failure) => {
      if output.is_json() {
        print_json(&RunReport {
          success: false,
          failed_stage: Some(&failure.stage),
          error: Some(failure.error.to_string()),
          artifacts: failure.last_state.artifacts().values().collect(),
          outputs: failure.last_state.outputs(),
          events: &failure.events,
        })?;
      } else {
        print_events(&failure.events);
      }
      let stage = failure.stage;
      Err(anyhow::Error::new(failure.error).context(format!("Stage '{}' failed", stage)))
    }
  }
}
