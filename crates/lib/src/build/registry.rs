//! Runtime identifier to builder lookup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::runtimes::{GoBuilder, JavaBuilder, NodeBuilder, PythonBuilder};
use super::{Artifact, BuildConfig, BuildError, BuildFn, Builder, Decorator};
use crate::context::Context;

const GO_RUNTIMES: &[&str] = &["go1.x", "provided.al2", "provided.al2023"];
const NODE_RUNTIMES: &[&str] = &["nodejs18.x", "nodejs20.x", "nodejs22.x"];
const PYTHON_RUNTIMES: &[&str] = &["python3.9", "python3.10", "python3.11", "python3.12", "python3.13"];
const JAVA_RUNTIMES: &[&str] = &["java11", "java17", "java21"];

/// Maps runtime identifiers to builders.
///
/// The registry is itself a [`Builder`] that dispatches on `BuildConfig::runtime`, so a
/// decorated registry can be handed to the pipeline as a single build function.
#[derive(Clone, Default)]
pub struct Registry {
  builders: HashMap<String, BuildFn>,
}

impl std::fmt::Debug for Registry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Registry").field("runtimes", &self.runtimes()).finish()
  }
}

impl Registry {
  /// A registry with no runtimes.
  pub fn empty() -> Self {
    Self::default()
  }

  /// A registry with the Go, Node.js, Python and Java builders registered.
  pub fn with_defaults() -> Self {
    let mut registry = Self::empty();
    let go: BuildFn = Arc::new(GoBuilder::new());
    let node: BuildFn = Arc::new(NodeBuilder::new());
    let python: BuildFn = Arc::new(PythonBuilder::new());
    let java: BuildFn = Arc::new(JavaBuilder::new());
    for (runtimes, builder) in [
      (GO_RUNTIMES, go),
      (NODE_RUNTIMES, node),
      (PYTHON_RUNTIMES, python),
      (JAVA_RUNTIMES, java),
    ] {
      for runtime in runtimes {
        registry.register(*runtime, builder.clone());
      }
    }
    registry
  }

  /// Register `builder` for `runtime`, returning the builder it replaced.
  pub fn register(&mut self, runtime: impl Into<String>, builder: BuildFn) -> Option<BuildFn> {
    self.builders.insert(runtime.into(), builder)
  }

  pub fn with(mut self, runtime: impl Into<String>, builder: BuildFn) -> Self {
    self.register(runtime, builder);
    self
  }

  pub fn get(&self, runtime: &str) -> Option<BuildFn> {
    self.builders.get(runtime).cloned()
  }

  pub fn contains(&self, runtime: &str) -> bool {
    self.builders.contains_key(runtime)
  }

  /// Registered runtime identifiers, sorted.
  pub fn runtimes(&self) -> Vec<&str> {
    let mut runtimes: Vec<&str> = self.builders.keys().map(String::as_str).collect();
    runtimes.sort_unstable();
    runtimes
  }

  /// Apply `decorator` to every registered builder.
  pub fn decorate(self, decorator: &Decorator) -> Self {
    Self {
      builders: self
        .builders
        .into_iter()
        .map(|(runtime, builder)| (runtime, decorator(builder)))
        .collect(),
    }
  }

  /// Build every config in order, stopping at the first failure.
  pub async fn build_all(&self, ctx: &Context, configs: &[BuildConfig]) -> Result<Vec<Artifact>, BuildError> {
    let mut artifacts = Vec::with_capacity(configs.len());
    for config in configs {
      artifacts.push(self.build(ctx, config).await?);
    }
    Ok(artifacts)
  }
}

#[async_trait]
impl Builder for Registry {
  async fn build(&self, ctx: &Context, config: &BuildConfig) -> Result<Artifact, BuildError> {
    let builder = self
      .get(&config.runtime)
      .ok_or_else(|| BuildError::UnsupportedRuntime(config.runtime.clone()))?;
    builder.build(ctx, config).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::build::{build_fn, with_logging};
  use crate::util::hash::fingerprint_bytes;
  use std::path::PathBuf;
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn named(name: &'static str) -> BuildFn {
    build_fn(move |_ctx, config: BuildConfig| async move {
      Ok(Artifact {
        path: config.output_path,
        checksum: fingerprint_bytes(name.as_bytes()),
        size: 0,
      })
    })
  }

  #[test]
  fn defaults_cover_all_supported_runtimes() {
    let registry = Registry::with_defaults();
    for runtime in [
      "go1.x",
      "provided.al2",
      "provided.al2023",
      "nodejs18.x",
      "nodejs20.x",
      "nodejs22.x",
      "python3.9",
      "python3.13",
      "java11",
      "java17",
      "java21",
    ] {
      assert!(registry.contains(runtime), "missing {runtime}");
    }
    assert_eq!(registry.runtimes().len(), 14);
    assert!(!registry.contains("ruby3.3"));
  }

  #[tokio::test]
  async fn unknown_runtime_is_rejected() {
    let registry = Registry::with_defaults();

    let err = registry
      .build(&Context::new(), &BuildConfig::new("/src", "/out.zip", "ruby3.3"))
      .await
      .unwrap_err();

    assert!(matches!(err, BuildError::UnsupportedRuntime(ref r) if r == "ruby3.3"));
  }

  #[tokio::test]
  async fn dispatches_on_runtime_and_allows_overrides() {
    let mut registry = Registry::empty().with("custom", named("custom"));
    let replaced = registry.register("custom", named("second"));
    assert!(replaced.is_some());

    let artifact = registry
      .build(&Context::new(), &BuildConfig::new("/src", "/out.zip", "custom"))
      .await
      .unwrap();

    assert_eq!(artifact.checksum, fingerprint_bytes(b"second"));
    assert_eq!(artifact.path, PathBuf::from("/out.zip"));
  }

  #[tokio::test]
  async fn decorate_wraps_every_builder() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter: Decorator = {
      let calls = calls.clone();
      Arc::new(move |inner: BuildFn| {
        let calls = calls.clone();
        build_fn(move |ctx, config| {
          let inner = inner.clone();
          let calls = calls.clone();
          async move {
            calls.fetch_add(1, Ordering::SeqCst);
            inner.build(&ctx, &config).await
          }
        })
      })
    };
    let registry = Registry::empty()
      .with("a", named("a"))
      .with("b", named("b"))
      .decorate(&counter)
      .decorate(&with_logging());
    let ctx = Context::new();

    registry.build(&ctx, &BuildConfig::new("/src", "/a.zip", "a")).await.unwrap();
    registry.build(&ctx, &BuildConfig::new("/src", "/b.zip", "b")).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn build_all_stops_at_first_failure() {
    let registry = Registry::empty().with("ok", named("ok"));
    let configs = vec![
      BuildConfig::new("/src/a", "/a.zip", "ok"),
      BuildConfig::new("/src/b", "/b.zip", "missing"),
      BuildConfig::new("/src/c", "/c.zip", "ok"),
    ];

    let err = registry.build_all(&Context::new(), &configs).await.unwrap_err();
    assert!(matches!(err, BuildError::UnsupportedRuntime(_)));

    let ok = registry.build_all(&Context::new(), &configs[..1]).await.unwrap();
    assert_eq!(ok.len(), 1);
  }
}
