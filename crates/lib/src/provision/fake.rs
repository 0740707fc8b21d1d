//! In-memory [`Provisioner`] that records calls.
//!
//! It models a single configuration: changes are pending until an apply, and a
//! destroy makes them pending again. Failures can be scripted per operation.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use super::{
  ApplyConfig, ApplyOption, DestroyConfig, DestroyOption, InitConfig, InitOption, Operation, PlanConfig, PlanOption,
  ProvisionError, Provisioner, resolve,
};
use crate::context::Context;
use crate::util::process::ProcessError;

/// One recorded invocation with its resolved options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
  Init { dir: PathBuf, config: InitConfig },
  Plan { dir: PathBuf, config: PlanConfig },
  Apply { dir: PathBuf, config: ApplyConfig },
  Destroy { dir: PathBuf, config: DestroyConfig },
  Output { dir: PathBuf },
  Validate { dir: PathBuf },
}

impl Call {
  pub fn operation(&self) -> Operation {
    match self {
      Call::Init { .. } => Operation::Init,
      Call::Plan { .. } => Operation::Plan,
      Call::Apply { .. } => Operation::Apply,
      Call::Destroy { .. } => Operation::Destroy,
      Call::Output { .. } => Operation::Output,
      Call::Validate { .. } => Operation::Validate,
    }
  }
}

#[derive(Debug)]
struct FakeState {
  calls: Vec<Call>,
  pending_changes: bool,
  outputs: BTreeMap<String, Value>,
  failures: HashMap<Operation, VecDeque<ProvisionError>>,
}

#[derive(Debug)]
pub struct FakeProvisioner {
  state: Mutex<FakeState>,
}

impl Default for FakeProvisioner {
  fn default() -> Self {
    Self::new()
  }
}

impl FakeProvisioner {
  /// A fresh configuration: changes pending, no outputs.
  pub fn new() -> Self {
    Self {
      state: Mutex::new(FakeState {
        calls: Vec::new(),
        pending_changes: true,
        outputs: BTreeMap::new(),
        failures: HashMap::new(),
      }),
    }
  }

  pub fn with_pending_changes(self, pending: bool) -> Self {
    self.lock().pending_changes = pending;
    self
  }

  pub fn with_outputs(self, outputs: BTreeMap<String, Value>) -> Self {
    self.lock().outputs = outputs;
    self
  }

  pub fn with_output(self, name: impl Into<String>, value: Value) -> Self {
    self.lock().outputs.insert(name.into(), value);
    self
  }

  /// Make the next call of `op` fail with `error`. Queued failures are used in order.
  pub fn fail_next(&self, op: Operation, error: ProvisionError) {
    self.lock().failures.entry(op).or_default().push_back(error);
  }

  pub fn calls(&self) -> Vec<Call> {
    self.lock().calls.clone()
  }

  pub fn operations(&self) -> Vec<Operation> {
    self.lock().calls.iter().map(Call::operation).collect()
  }

  pub fn has_pending_changes(&self) -> bool {
    self.lock().pending_changes
  }

  fn lock(&self) -> MutexGuard<'_, FakeState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Record `call`, then either fail with a scripted error or apply `effect`.
  fn record<T>(&self, ctx: &Context, call: Call, effect: impl FnOnce(&mut FakeState) -> T) -> Result<T, ProvisionError> {
    let op = call.operation();
    if ctx.is_cancelled() {
      return Err(ProcessError::Cancelled {
        program: format!("terraform {}", op),
      }
      .into());
    }
    let mut state = self.lock();
    state.calls.push(call);
    if let Some(error) = state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
      return Err(error);
    }
    Ok(effect(&mut *state))
  }
}

#[async_trait]
impl Provisioner for FakeProvisioner {
  async fn init(&self, ctx: &Context, dir: &Path, options: Vec<InitOption>) -> Result<(), ProvisionError> {
    let call = Call::Init {
      dir: dir.to_path_buf(),
      config: resolve(options),
    };
    self.record(ctx, call, |_| ())
  }

  async fn plan(&self, ctx: &Context, dir: &Path, options: Vec<PlanOption>) -> Result<bool, ProvisionError> {
    let config: PlanConfig = resolve(options);
    let out = config.out.clone();
    let call = Call::Plan {
      dir: dir.to_path_buf(),
      config,
    };
    let has_changes = self.record(ctx, call, |state| state.pending_changes)?;
    if let Some(out) = out {
      let path = if out.is_absolute() { out } else { dir.join(out) };
      std::fs::write(&path, "fake plan").map_err(|source| ProcessError::Spawn {
        program: "terraform plan".into(),
        source,
      })?;
    }
    Ok(has_changes)
  }

  async fn apply(&self, ctx: &Context, dir: &Path, options: Vec<ApplyOption>) -> Result<(), ProvisionError> {
    let call = Call::Apply {
      dir: dir.to_path_buf(),
      config: resolve(options),
    };
    self.record(ctx, call, |state| state.pending_changes = false)
  }

  async fn destroy(&self, ctx: &Context, dir: &Path, options: Vec<DestroyOption>) -> Result<(), ProvisionError> {
    let call = Call::Destroy {
      dir: dir.to_path_buf(),
      config: resolve(options),
    };
    self.record(ctx, call, |state| {
      state.pending_changes = true;
      state.outputs.clear();
    })
  }

  async fn outputs(&self, ctx: &Context, dir: &Path) -> Result<BTreeMap<String, Value>, ProvisionError> {
    let call = Call::Output { dir: dir.to_path_buf() };
    self.record(ctx, call, |state| state.outputs.clone())
  }

  async fn validate(&self, ctx: &Context, dir: &Path) -> Result<(), ProvisionError> {
    let call = Call::Validate { dir: dir.to_path_buf() };
    self.record(ctx, call, |_| ())
  }
}
