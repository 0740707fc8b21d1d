//! Per-command option lists.
//!
//! Callers pass a list of option values; [`resolve`] folds them left to right into the
//! command's config struct. Scalar options overwrite earlier values, `BackendConfig`
//! accumulates, and `Var` overwrites per key. An empty list yields the defaults.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// A single option that updates a command config in place.
pub trait CommandOption {
  type Config: Default;

  fn apply(self, config: &mut Self::Config);
}

/// Fold `options` into the command's default config.
pub fn resolve<O: CommandOption>(options: impl IntoIterator<Item = O>) -> O::Config {
  let mut config = O::Config::default();
  for option in options {
    option.apply(&mut config);
  }
  config
}

fn push_vars(args: &mut Vec<String>, var_file: &Option<PathBuf>, vars: &BTreeMap<String, String>) {
  if let Some(file) = var_file {
    args.push(format!("-var-file={}", file.display()));
  }
  for (key, value) in vars {
    args.push("-var".into());
    args.push(format!("{}={}", key, value));
  }
}

// init

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOption {
  Upgrade(bool),
  Backend(bool),
  Reconfigure(bool),
  BackendConfig(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitConfig {
  pub upgrade: bool,
  pub backend: bool,
  pub reconfigure: bool,
  pub backend_config: Vec<String>,
}

impl Default for InitConfig {
  fn default() -> Self {
    Self {
      upgrade: false,
      backend: true,
      reconfigure: false,
      backend_config: Vec::new(),
    }
  }
}

impl CommandOption for InitOption {
  type Config = InitConfig;

  fn apply(self, config: &mut InitConfig) {
    match self {
      InitOption::Upgrade(v) => config.upgrade = v,
      InitOption::Backend(v) => config.backend = v,
      InitOption::Reconfigure(v) => config.reconfigure = v,
      InitOption::BackendConfig(value) => config.backend_config.push(value),
    }
  }
}

impl InitConfig {
  pub fn args(&self) -> Vec<String> {
    let mut args = vec!["init".to_string(), "-input=false".into(), "-no-color".into()];
    if self.upgrade {
      args.push("-upgrade".into());
    }
    if !self.backend {
      args.push("-backend=false".into());
    }
    if self.reconfigure {
      args.push("-reconfigure".into());
    }
    for value in &self.backend_config {
      args.push(format!("-backend-config={}", value));
    }
    args
  }
}

// plan

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOption {
  Out(PathBuf),
  Destroy(bool),
  VarFile(PathBuf),
  Var(String, String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanConfig {
  pub out: Option<PathBuf>,
  pub destroy: bool,
  pub var_file: Option<PathBuf>,
  pub vars: BTreeMap<String, String>,
}

impl CommandOption for PlanOption {
  type Config = PlanConfig;

  fn apply(self, config: &mut PlanConfig) {
    match self {
      PlanOption::Out(path) => config.out = Some(path),
      PlanOption::Destroy(v) => config.destroy = v,
      PlanOption::VarFile(path) => config.var_file = Some(path),
      PlanOption::Var(key, value) => {
        config.vars.insert(key, value);
      }
    }
  }
}

impl PlanConfig {
  /// Plan always runs with `-detailed-exitcode`: 0 means no changes, 2 means changes.
  pub fn args(&self) -> Vec<String> {
    let mut args = vec![
      "plan".to_string(),
      "-input=false".into(),
      "-no-color".into(),
      "-detailed-exitcode".into(),
    ];
    if let Some(out) = &self.out {
      args.push(format!("-out={}", out.display()));
    }
    if self.destroy {
      args.push("-destroy".into());
    }
    push_vars(&mut args, &self.var_file, &self.vars);
    args
  }
}

// apply

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOption {
  AutoApprove(bool),
  VarFile(PathBuf),
  Var(String, String),
  PlanFile(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyConfig {
  pub auto_approve: bool,
  pub var_file: Option<PathBuf>,
  pub vars: BTreeMap<String, String>,
  pub plan_file: Option<PathBuf>,
}

impl CommandOption for ApplyOption {
  type Config = ApplyConfig;

  fn apply(self, config: &mut ApplyConfig) {
    match self {
      ApplyOption::AutoApprove(v) => config.auto_approve = v,
      ApplyOption::VarFile(path) => config.var_file = Some(path),
      ApplyOption::Var(key, value) => {
        config.vars.insert(key, value);
      }
      ApplyOption::PlanFile(path) => config.plan_file = Some(path),
    }
  }
}

impl ApplyConfig {
  /// A saved plan already carries its variables, so they are only passed without one.
  pub fn args(&self) -> Vec<String> {
    let mut args = vec!["apply".to_string(), "-input=false".into(), "-no-color".into()];
    if self.auto_approve {
      args.push("-auto-approve".into());
    }
    match &self.plan_file {
      Some(plan) => args.push(plan.display().to_string()),
      None => push_vars(&mut args, &self.var_file, &self.vars),
    }
    args
  }
}

// destroy

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyOption {
  AutoApprove(bool),
  VarFile(PathBuf),
  Var(String, String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestroyConfig {
  pub auto_approve: bool,
  pub var_file: Option<PathBuf>,
  pub vars: BTreeMap<String, String>,
}

impl CommandOption for DestroyOption {
  type Config = DestroyConfig;

  fn apply(self, config: &mut DestroyConfig) {
    match self {
      DestroyOption::AutoApprove(v) => config.auto_approve = v,
      DestroyOption::VarFile(path) => config.var_file = Some(path),
      DestroyOption::Var(key, value) => {
        config.vars.insert(key, value);
      }
    }
  }
}

impl DestroyConfig {
  pub fn args(&self) -> Vec<String> {
    let mut args = vec!["destroy".to_string(), "-input=false".into(), "-no-color".into()];
    if self.auto_approve {
      args.push("-auto-approve".into());
    }
    push_vars(&mut args, &self.var_file, &self.vars);
    args
  }
}
