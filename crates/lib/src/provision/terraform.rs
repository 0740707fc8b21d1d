use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info};

use super::{
  ApplyOption, DestroyOption, InitOption, Operation, PlanOption, ProvisionError, Provisioner, classify, resolve,
};
use crate::consts::DEFAULT_TERRAFORM_BIN;
use crate::context::Context;
use crate::util::process::{ProcessOutput, run_process};

/// [`Provisioner`] backed by the terraform command line.
///
/// Every invocation is non-interactive (`-input=false`). Apply and destroy therefore
/// need `AutoApprove(true)`; interactive approval belongs to the caller.
#[derive(Debug, Clone)]
pub struct TerraformCli {
  binary: PathBuf,
  env: BTreeMap<String, String>,
}

impl Default for TerraformCli {
  fn default() -> Self {
    Self::new(DEFAULT_TERRAFORM_BIN)
  }
}

#[derive(Deserialize)]
struct OutputMeta {
  value: Value,
}

impl TerraformCli {
  pub fn new(binary: impl Into<PathBuf>) -> Self {
    Self {
      binary: binary.into(),
      env: BTreeMap::new(),
    }
  }

  /// Extra environment for every invocation, e.g. `TF_VAR_*` or backend credentials.
  pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  pub fn binary(&self) -> &Path {
    &self.binary
  }

  async fn exec(&self, ctx: &Context, dir: &Path, op: Operation, args: Vec<String>) -> Result<ProcessOutput, ProvisionError> {
    info!(command = %op, dir = %dir.display(), "running terraform");
    debug!(args = ?args, "terraform arguments");

    let mut command = Command::new(&self.binary);
    command
      .args(&args)
      .current_dir(dir)
      .env("TF_IN_AUTOMATION", "1")
      .envs(&self.env)
      .stdin(Stdio::null());
    Ok(run_process(ctx, command).await?)
  }

  /// Run `op` and turn a non-zero exit into a classified error.
  async fn run(&self, ctx: &Context, dir: &Path, op: Operation, args: Vec<String>) -> Result<ProcessOutput, ProvisionError> {
    let output = self.exec(ctx, dir, op, args).await?;
    if output.success() {
      Ok(output)
    } else {
      Err(classify(op.as_str(), output.code.unwrap_or(-1), &output.stdout, &output.stderr))
    }
  }
}

/// Treat the no-changes outcome as success.
fn tolerate_no_changes(result: Result<ProcessOutput, ProvisionError>) -> Result<(), ProvisionError> {
  match result {
    Ok(_) => Ok(()),
    Err(e) if e.is_no_op() => Ok(()),
    Err(e) => Err(e),
  }
}

/// Decode `terraform output -json` into plain values.
pub fn parse_outputs(json: &str) -> Result<BTreeMap<String, Value>, ProvisionError> {
  let trimmed = json.trim();
  if trimmed.is_empty() {
    return Ok(BTreeMap::new());
  }
  let raw: BTreeMap<String, OutputMeta> =
    serde_json::from_str(trimmed).map_err(|source| ProvisionError::InvalidOutput {
      command: Operation::Output.to_string(),
      source,
    })?;
  Ok(raw.into_iter().map(|(name, meta)| (name, meta.value)).collect())
}

#[async_trait]
impl Provisioner for TerraformCli {
  async fn init(&self, ctx: &Context, dir: &Path, options: Vec<InitOption>) -> Result<(), ProvisionError> {
    let args = resolve(options).args();
    self.run(ctx, dir, Operation::Init, args).await?;
    Ok(())
  }

  async fn plan(&self, ctx: &Context, dir: &Path, options: Vec<PlanOption>) -> Result<bool, ProvisionError> {
    let args = resolve(options).args();
    let output = self.exec(ctx, dir, Operation::Plan, args).await?;
    match output.code {
      Some(0) => Ok(false),
      Some(2) => Ok(true),
      code => match classify("plan", code.unwrap_or(-1), &output.stdout, &output.stderr) {
        ProvisionError::NoChanges => Ok(false),
        e => Err(e),
      },
    }
  }

  async fn apply(&self, ctx: &Context, dir: &Path, options: Vec<ApplyOption>) -> Result<(), ProvisionError> {
    let args = resolve(options).args();
    tolerate_no_changes(self.run(ctx, dir, Operation::Apply, args).await)
  }

  async fn destroy(&self, ctx: &Context, dir: &Path, options: Vec<DestroyOption>) -> Result<(), ProvisionError> {
    let args = resolve(options).args();
    tolerate_no_changes(self.run(ctx, dir, Operation::Destroy, args).await)
  }

  async fn outputs(&self, ctx: &Context, dir: &Path) -> Result<BTreeMap<String, Value>, ProvisionError> {
    let args = vec!["output".to_string(), "-json".into(), "-no-color".into()];
    let output = self.run(ctx, dir, Operation::Output, args).await?;
    parse_outputs(&output.stdout)
  }

  async fn validate(&self, ctx: &Context, dir: &Path) -> Result<(), ProvisionError> {
    let args = vec!["validate".to_string(), "-no-color".into()];
    self.run(ctx, dir, Operation::Validate, args).await?;
    Ok(())
  }
}
