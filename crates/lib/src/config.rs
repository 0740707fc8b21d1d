//! Project configuration from `forge.toml`.
//!
//! ```toml
//! [project]
//! name = "shop"
//! region = "eu-west-1"
//!
//! [terraform]
//! binary = "tofu"
//! infra_dir = "infra"
//!
//! [build]
//! dir = ".forge/build"
//! parallel = true
//!
//! [[functions]]
//! name = "api"
//! runtime = "provided.al2023"
//! ```
//!
//! Every section is optional and a missing file means all defaults.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{
  CONFIG_FILE, DEFAULT_BUILD_DIR, DEFAULT_FUNCTIONS_DIR, DEFAULT_INFRA_DIR, DEFAULT_TERRAFORM_BIN, ENV_REGION,
  ENV_TERRAFORM_BIN,
};
use crate::discovery::FunctionSpec;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid configuration: {0}")]
  Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSection {
  pub name: Option<String>,
  pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerraformSection {
  pub binary: PathBuf,
  pub infra_dir: PathBuf,
}

impl Default for TerraformSection {
  fn default() -> Self {
    Self {
      binary: PathBuf::from(DEFAULT_TERRAFORM_BIN),
      infra_dir: PathBuf::from(DEFAULT_INFRA_DIR),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSection {
  pub dir: PathBuf,
  /// Build functions concurrently.
  pub parallel: bool,
}

impl Default for BuildSection {
  fn default() -> Self {
    Self {
      dir: PathBuf::from(DEFAULT_BUILD_DIR),
      parallel: false,
    }
  }
}

/// A `[[functions]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionEntry {
  pub name: String,
  pub runtime: String,
  /// Source directory relative to the project. Defaults to `src/functions/<name>`.
  #[serde(default)]
  pub source: Option<PathBuf>,
  #[serde(default)]
  pub handler: Option<String>,
  #[serde(default)]
  pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeConfig {
  pub project: ProjectSection,
  pub terraform: TerraformSection,
  pub build: BuildSection,
  pub functions: Vec<FunctionEntry>,
}

impl ForgeConfig {
  /// Load `forge.toml` from `project_dir`, then apply environment overrides and validate.
  pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
    let path = project_dir.join(CONFIG_FILE);
    let mut config = match std::fs::read_to_string(&path) {
      Ok(text) => Self::parse(&path, &text)?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no config file, using defaults");
        Self::default()
      }
      Err(source) => return Err(ConfigError::Read { path, source }),
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
  }

  fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  fn apply_env(&mut self) {
    if let Some(binary) = std::env::var_os(ENV_TERRAFORM_BIN).filter(|v| !v.is_empty()) {
      self.terraform.binary = PathBuf::from(binary);
    }
    if let Some(region) = std::env::var(ENV_REGION).ok().filter(|v| !v.is_empty()) {
      self.project.region = Some(region);
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for function in &self.functions {
      if function.name.trim().is_empty() {
        return Err(ConfigError::Invalid("function name cannot be empty".into()));
      }
      if function.runtime.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
          "function '{}' has no runtime",
          function.name
        )));
      }
      if !seen.insert(function.name.as_str()) {
        return Err(ConfigError::Invalid(format!(
          "function '{}' is declared more than once",
          function.name
        )));
      }
    }
    Ok(())
  }

  /// Declared functions with their source directories resolved against `project_dir`.
  pub fn functions(&self, project_dir: &Path) -> Vec<FunctionSpec> {
    self
      .functions
      .iter()
      .map(|entry| {
        let source = match &entry.source {
          Some(source) => project_dir.join(source),
          None => project_dir.join(DEFAULT_FUNCTIONS_DIR).join(&entry.name),
        };
        FunctionSpec {
          name: entry.name.clone(),
          runtime: entry.runtime.clone(),
          source_dir: source,
          handler: entry.handler.clone(),
          env: entry.env.clone(),
        }
      })
      .collect()
  }

  pub fn infra_dir(&self, project_dir: &Path) -> PathBuf {
    project_dir.join(&self.terraform.infra_dir)
  }

  pub fn build_dir(&self, project_dir: &Path) -> PathBuf {
    project_dir.join(&self.build.dir)
  }
}
