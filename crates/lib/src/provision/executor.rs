use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{ApplyOption, DestroyOption, InitOption, PlanOption, ProvisionError};
use crate::context::Context;

/// The provisioning commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
  Init,
  Plan,
  Apply,
  Destroy,
  Output,
  Validate,
}

impl Operation {
  pub fn as_str(&self) -> &'static str {
    match self {
      Operation::Init => "init",
      Operation::Plan => "plan",
      Operation::Apply => "apply",
      Operation::Destroy => "destroy",
      Operation::Output => "output",
      Operation::Validate => "validate",
    }
  }
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Infrastructure operations against a configuration directory.
///
/// [`TerraformCli`](super::TerraformCli) drives the real tool; [`FakeProvisioner`](super::FakeProvisioner)
/// records calls for tests. Pipelines depend only on this trait.
#[async_trait]
pub trait Provisioner: Send + Sync {
  async fn init(&self, ctx: &Context, dir: &Path, options: Vec<InitOption>) -> Result<(), ProvisionError>;

  /// Returns whether the plan contains changes.
  async fn plan(&self, ctx: &Context, dir: &Path, options: Vec<PlanOption>) -> Result<bool, ProvisionError>;

  async fn apply(&self, ctx: &Context, dir: &Path, options: Vec<ApplyOption>) -> Result<(), ProvisionError>;

  async fn destroy(&self, ctx: &Context, dir: &Path, options: Vec<DestroyOption>) -> Result<(), ProvisionError>;

  /// Output values by name, already decoded from their JSON encoding.
  async fn outputs(&self, ctx: &Context, dir: &Path) -> Result<BTreeMap<String, Value>, ProvisionError>;

  async fn validate(&self, ctx: &Context, dir: &Path) -> Result<(), ProvisionError>;
}

pub type ProvisionerRef = Arc<dyn Provisioner>;
