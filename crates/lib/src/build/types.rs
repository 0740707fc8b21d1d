use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::Context;
use crate::util::hash::{Fingerprint, FingerprintError, fingerprint_file};
use crate::util::process::ProcessError;

/// Input to a single build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
  /// Root of the function's sources.
  pub source_dir: PathBuf,
  /// Where the artifact is written. Empty means the runtime's default inside `source_dir`.
  #[serde(default)]
  pub output_path: PathBuf,
  /// Runtime identifier, e.g. `go1.x`, `nodejs20.x`, `python3.12`, `java21`.
  pub runtime: String,
  /// Runtime-specific entry point. For Go this is the package directory.
  #[serde(default)]
  pub handler: String,
  /// Extra environment for toolchain invocations.
  #[serde(default)]
  pub env: BTreeMap<String, String>,
}

impl BuildConfig {
  pub fn new(source_dir: impl Into<PathBuf>, output_path: impl Into<PathBuf>, runtime: impl Into<String>) -> Self {
    Self {
      source_dir: source_dir.into(),
      output_path: output_path.into(),
      runtime: runtime.into(),
      handler: String::new(),
      env: BTreeMap::new(),
    }
  }

  pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
    self.handler = handler.into();
    self
  }

  pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  /// The configured output path, or `default` relative to the source directory.
  pub(crate) fn output_or(&self, default: &str) -> PathBuf {
    if self.output_path.as_os_str().is_empty() {
      self.source_dir.join(default)
    } else {
      self.output_path.clone()
    }
  }

  pub(crate) fn ensure_source_dir(&self) -> Result<(), BuildError> {
    if self.source_dir.is_dir() {
      Ok(())
    } else {
      Err(BuildError::InvalidConfig(format!(
        "source directory {} does not exist",
        self.source_dir.display()
      )))
    }
  }
}

/// The file a successful build produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
  pub path: PathBuf,
  /// SHA-256 of the file contents.
  pub checksum: Fingerprint,
  /// Size in bytes.
  pub size: u64,
}

impl Artifact {
  /// Describe an existing file on disk.
  pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, BuildError> {
    let path = path.into();
    let size = std::fs::metadata(&path)?.len();
    let checksum = fingerprint_file(&path)?;
    Ok(Self { path, checksum, size })
  }

  pub fn file_name(&self) -> String {
    self
      .path
      .file_name()
      .map(|n| n.to_string_lossy().to_string())
      .unwrap_or_else(|| self.path.display().to_string())
  }

  pub fn size_mb(&self) -> f64 {
    self.size as f64 / (1024.0 * 1024.0)
  }
}

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("unsupported runtime: {0}")]
  UnsupportedRuntime(String),

  #[error("invalid build config: {0}")]
  InvalidConfig(String),

  #[error("{manifest} not found in {}", .dir.display())]
  MissingManifest { manifest: &'static str, dir: PathBuf },

  #[error("failed to parse {}: {source}", .path.display())]
  InvalidManifest {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("{command} failed (exit code {})\n{output}", .code.map(|c| c.to_string()).unwrap_or_else(|| "none".into()))]
  CommandFailed {
    command: String,
    code: Option<i32>,
    output: String,
  },

  #[error("no jar file found in {}", .0.display())]
  NoJarFound(PathBuf),

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error("failed to write archive: {0}")]
  Archive(#[from] zip::result::ZipError),

  #[error(transparent)]
  Fingerprint(#[from] FingerprintError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl BuildError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, BuildError::Process(e) if e.is_cancelled())
  }
}

/// Something that can turn a [`BuildConfig`] into an [`Artifact`].
///
/// Runtime builders, the [`Registry`](super::Registry) and every decorator implement this,
/// so they compose freely.
#[async_trait]
pub trait Builder: Send + Sync {
  async fn build(&self, ctx: &Context, config: &BuildConfig) -> Result<Artifact, BuildError>;
}

/// Shared, type-erased builder.
pub type BuildFn = Arc<dyn Builder>;

struct FnBuilder<F>(F);

#[async_trait]
impl<F, Fut> Builder for FnBuilder<F>
where
  F: Fn(Context, BuildConfig) -> Fut + Send + Sync,
  Fut: Future<Output = Result<Artifact, BuildError>> + Send,
{
  async fn build(&self, ctx: &Context, config: &BuildConfig) -> Result<Artifact, BuildError> {
    (self.0)(ctx.clone(), config.clone()).await
  }
}

/// Wrap an async closure as a [`BuildFn`].
pub fn build_fn<F, Fut>(f: F) -> BuildFn
where
  F: Fn(Context, BuildConfig) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Artifact, BuildError>> + Send + 'static,
{
  Arc::new(FnBuilder(f))
}

/// Remove a previous artifact so a failed build never leaves a stale one behind.
pub(crate) fn remove_stale(path: &Path) -> Result<(), BuildError> {
  match std::fs::remove_file(path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(e.into()),
  }
}
