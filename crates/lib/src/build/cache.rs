//! Content-addressed build cache.
//!
//! Results are keyed by a fingerprint of the source tree plus the runtime and output
//! path, so any source change produces a new key. Each key holds a once-cell:
//! concurrent requests for the same key wait on a single build instead of racing.
//! Failures are not stored; the next request for that key builds again.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;
use tracing::debug;

use super::archive::should_skip;
use super::{Artifact, BuildConfig, BuildError};
use crate::util::hash::{Fingerprint, fingerprint_dir};

/// Artifacts the runtime builders write into the source tree when no output path is set.
const DEFAULT_ARTIFACT_NAMES: [&str; 2] = ["bootstrap.zip", "lambda.zip"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  pub source: Fingerprint,
  pub runtime: String,
  pub output_path: PathBuf,
}

impl CacheKey {
  /// Fingerprint the config's source tree as the builder will package it.
  ///
  /// Names the packager skips are skipped here too. Directories the runtime's own
  /// toolchain writes at the source root (`target` for Java, `node_modules` for
  /// Node when `package.json` drives the install) and the artifact itself, when
  /// written inside the source tree, are excluded so building does not invalidate
  /// the key.
  pub fn for_config(config: &BuildConfig) -> Result<Self, BuildError> {
    let source = &config.source_dir;
    let mut exclude: Vec<String> = Vec::new();
    if config.runtime.starts_with("java") {
      exclude.push("target".into());
    }
    if config.runtime.starts_with("nodejs") && source.join("package.json").is_file() {
      exclude.push("node_modules".into());
    }
    if config.output_path.as_os_str().is_empty() {
      exclude.extend(DEFAULT_ARTIFACT_NAMES.map(String::from));
    } else if let Ok(rel) = config.output_path.strip_prefix(source) {
      let rel = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
      if !rel.is_empty() {
        exclude.push(rel);
      }
    }
    let exclude: Vec<&str> = exclude.iter().map(String::as_str).collect();

    Ok(Self {
      source: fingerprint_dir(source, &exclude, should_skip)?,
      runtime: config.runtime.clone(),
      output_path: config.output_path.clone(),
    })
  }
}

#[derive(Debug, Default)]
pub struct BuildCache {
  entries: Mutex<HashMap<CacheKey, Arc<OnceCell<Artifact>>>>,
  hits: AtomicUsize,
  misses: AtomicUsize,
}

impl BuildCache {
  pub fn new() -> Self {
    Self::default()
  }

  fn slot(&self, key: CacheKey) -> Arc<OnceCell<Artifact>> {
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries.entry(key).or_default().clone()
  }

  /// Return the cached artifact for `key`, running `build` at most once per key
  /// among concurrent callers.
  pub async fn get_or_build<F, Fut>(&self, key: CacheKey, build: F) -> Result<Artifact, BuildError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Artifact, BuildError>>,
  {
    let slot = self.slot(key);
    if let Some(artifact) = slot.get() {
      self.hits.fetch_add(1, Ordering::Relaxed);
      debug!(path = %artifact.path.display(), "build cache hit");
      return Ok(artifact.clone());
    }

    let mut built = false;
    let artifact = slot
      .get_or_try_init(|| {
        built = true;
        build()
      })
      .await?;
    if built {
      self.misses.fetch_add(1, Ordering::Relaxed);
    } else {
      self.hits.fetch_add(1, Ordering::Relaxed);
    }
    Ok(artifact.clone())
  }

  pub fn get(&self, key: &CacheKey) -> Option<Artifact> {
    let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries.get(key).and_then(|cell| cell.get().cloned())
  }

  /// Number of keys holding a completed artifact.
  pub fn len(&self) -> usize {
    let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries.values().filter(|cell| cell.initialized()).count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn hits(&self) -> usize {
    self.hits.load(Ordering::Relaxed)
  }

  pub fn misses(&self) -> usize {
    self.misses.load(Ordering::Relaxed)
  }
}
