use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use super::PipelineError;
use crate::build::Artifact;

/// Opaque, typed value shared between stages (e.g. a plan outcome or discovered functions).
#[derive(Clone)]
struct ConfigSlot {
  value: Arc<dyn Any + Send + Sync>,
  type_name: &'static str,
}

impl fmt::Debug for ConfigSlot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ConfigSlot").field("type", &self.type_name).finish()
  }
}

/// The record threaded through a pipeline.
///
/// Stages never mutate the state they receive; the `with_*` methods consume a state
/// and return the updated one. Cloning is cheap enough to keep a copy of every
/// intermediate state, which is what lets a failed run report the last good state.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
  project_dir: PathBuf,
  artifacts: BTreeMap<String, Artifact>,
  outputs: BTreeMap<String, Value>,
  config: Option<ConfigSlot>,
}

impl PipelineState {
  pub fn new(project_dir: impl Into<PathBuf>) -> Self {
    Self {
      project_dir: project_dir.into(),
      ..Self::default()
    }
  }

  pub fn project_dir(&self) -> &Path {
    &self.project_dir
  }

  /// Artifacts by function name.
  pub fn artifacts(&self) -> &BTreeMap<String, Artifact> {
    &self.artifacts
  }

  pub fn artifact(&self, function: &str) -> Option<&Artifact> {
    self.artifacts.get(function)
  }

  pub fn outputs(&self) -> &BTreeMap<String, Value> {
    &self.outputs
  }

  pub fn output(&self, name: &str) -> Option<&Value> {
    self.outputs.get(name)
  }

  pub fn with_artifact(mut self, function: impl Into<String>, artifact: Artifact) -> Self {
    self.artifacts.insert(function.into(), artifact);
    self
  }

  /// Replace all outputs.
  pub fn with_outputs(mut self, outputs: BTreeMap<String, Value>) -> Self {
    self.outputs = outputs;
    self
  }

  pub fn with_output(mut self, name: impl Into<String>, value: Value) -> Self {
    self.outputs.insert(name.into(), value);
    self
  }

  /// Store `value` in the config slot, replacing whatever was there.
  pub fn with_config<T: Any + Send + Sync>(mut self, value: T) -> Self {
    self.config = Some(ConfigSlot {
      value: Arc::new(value),
      type_name: type_name::<T>(),
    });
    self
  }

  pub fn without_config(mut self) -> Self {
    self.config = None;
    self
  }

  pub fn has_config(&self) -> bool {
    self.config.is_some()
  }

  /// The config slot as `T`.
  ///
  /// An empty slot or a value of another type is a composition error: the stage
  /// was placed after the wrong producer.
  pub fn config<T: Any + Send + Sync>(&self) -> Result<&T, PipelineError> {
    let slot = self.config.as_ref().ok_or(PipelineError::UnexpectedConfig {
      expected: type_name::<T>(),
      found: "nothing",
    })?;
    slot.value.downcast_ref::<T>().ok_or(PipelineError::UnexpectedConfig {
      expected: type_name::<T>(),
      found: slot.type_name,
    })
  }

  /// Fold the deltas of concurrently run branches back into `base`.
  ///
  /// Artifacts and outputs a branch added or changed relative to `base` are unioned;
  /// two branches writing different values under one key is a conflict. The config
  /// slot is taken from the last branch (in declaration order) that replaced it.
  pub(crate) fn merge_branches(base: &PipelineState, branches: Vec<PipelineState>) -> Result<Self, PipelineError> {
    let mut merged = base.clone();
    let mut written_artifacts: BTreeMap<String, Artifact> = BTreeMap::new();
    let mut written_outputs: BTreeMap<String, Value> = BTreeMap::new();

    for branch in branches {
      for (name, artifact) in branch.artifacts {
        if base.artifacts.get(&name) == Some(&artifact) {
          continue;
        }
        if written_artifacts.get(&name).is_some_and(|prev| *prev != artifact) {
          return Err(PipelineError::MergeConflict { kind: "artifact", key: name });
        }
        merged.artifacts.insert(name.clone(), artifact.clone());
        written_artifacts.insert(name, artifact);
      }

      for (name, value) in branch.outputs {
        if base.outputs.get(&name) == Some(&value) {
          continue;
        }
        if written_outputs.get(&name).is_some_and(|prev| *prev != value) {
          return Err(PipelineError::MergeConflict { kind: "output", key: name });
        }
        merged.outputs.insert(name.clone(), value.clone());
        written_outputs.insert(name, value);
      }

      if !same_slot(&base.config, &branch.config) {
        merged.config = branch.config;
      }
    }
    Ok(merged)
  }
}

fn same_slot(a: &Option<ConfigSlot>, b: &Option<ConfigSlot>) -> bool {
  match (a, b) {
    (None, None) => true,
    (Some(a), Some(b)) => Arc::ptr_eq(&a.value, &b.value),
    _ => false,
  }
}
