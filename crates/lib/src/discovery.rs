//! Functions handed to the build stages.
//!
//! Finding functions is someone else's job (the CLI reads them from `forge.toml`);
//! this module only fixes the shape of the list and how an entry becomes a
//! [`BuildConfig`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::build::{BuildConfig, BuildError};

/// One deployable function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
  pub name: String,
  pub runtime: String,
  pub source_dir: PathBuf,
  #[serde(default)]
  pub handler: Option<String>,
  #[serde(default)]
  pub env: BTreeMap<String, String>,
}

impl FunctionSpec {
  pub fn new(name: impl Into<String>, runtime: impl Into<String>, source_dir: impl Into<PathBuf>) -> Self {
    Self {
      name: name.into(),
      runtime: runtime.into(),
      source_dir: source_dir.into(),
      handler: None,
      env: BTreeMap::new(),
    }
  }

  pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
    self.handler = Some(handler.into());
    self
  }

  /// The handler to build with, falling back to the runtime family's convention.
  pub fn handler_or_default(&self) -> String {
    if let Some(handler) = self.handler.as_deref().filter(|h| !h.is_empty()) {
      return handler.to_string();
    }
    if self.runtime.starts_with("nodejs") {
      "index.handler".to_string()
    } else if self.runtime.starts_with("python") {
      "handler".to_string()
    } else {
      "bootstrap".to_string()
    }
  }

  /// Where this function's artifact goes inside `build_dir`.
  pub fn artifact_path(&self, build_dir: &Path) -> PathBuf {
    let extension = if self.runtime.starts_with("java") { "jar" } else { "zip" };
    build_dir.join(format!("{}.{}", self.name, extension))
  }

  pub fn to_build_config(&self, build_dir: &Path) -> Result<BuildConfig, BuildError> {
    if self.name.is_empty() {
      return Err(BuildError::InvalidConfig("function name cannot be empty".into()));
    }
    if self.runtime.is_empty() {
      return Err(BuildError::InvalidConfig(format!("function '{}' has no runtime", self.name)));
    }
    if self.source_dir.as_os_str().is_empty() {
      return Err(BuildError::InvalidConfig(format!(
        "function '{}' has no source directory",
        self.name
      )));
    }

    let mut config = BuildConfig::new(&self.source_dir, self.artifact_path(build_dir), &self.runtime)
      .with_handler(self.handler_or_default());
    config.env = self.env.clone();
    Ok(config)
  }
}
