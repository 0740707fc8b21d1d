//! Build decorators.
//!
//! A decorator takes a builder and returns a builder with extra behavior.
//! `compose(vec![a, b])` applied to `f` yields `a(b(f))`: the first decorator in the
//! list is the outermost.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::{Artifact, BuildCache, BuildConfig, BuildError, BuildFn, Builder, CacheKey};
use crate::context::Context;

pub type Decorator = Arc<dyn Fn(BuildFn) -> BuildFn + Send + Sync>;

struct Cached {
  inner: BuildFn,
  cache: Arc<BuildCache>,
}

#[async_trait]
impl Builder for Cached {
  async fn build(&self, ctx: &Context, config: &BuildConfig) -> Result<Artifact, BuildError> {
    let key = CacheKey::for_config(config)?;
    self.cache.get_or_build(key, || self.inner.build(ctx, config)).await
  }
}

/// Serve repeated builds of unchanged sources from `cache`.
pub fn with_cache(cache: Arc<BuildCache>) -> Decorator {
  Arc::new(move |inner| {
    Arc::new(Cached {
      inner,
      cache: cache.clone(),
    }) as BuildFn
  })
}

struct Logged {
  inner: BuildFn,
}

#[async_trait]
impl Builder for Logged {
  async fn build(&self, ctx: &Context, config: &BuildConfig) -> Result<Artifact, BuildError> {
    info!(runtime = %config.runtime, source = %config.source_dir.display(), "building");
    let result = self.inner.build(ctx, config).await;
    match &result {
      Ok(artifact) => info!(
        runtime = %config.runtime,
        path = %artifact.path.display(),
        checksum = %artifact.checksum.short(),
        size = artifact.size,
        "build succeeded"
      ),
      Err(e) => error!(runtime = %config.runtime, error = %e, "build failed"),
    }
    result
  }
}

/// Log the start and outcome of every build.
pub fn with_logging() -> Decorator {
  Arc::new(|inner| Arc::new(Logged { inner }) as BuildFn)
}

/// Combine decorators into one; the first listed is applied outermost.
pub fn compose(decorators: Vec<Decorator>) -> Decorator {
  Arc::new(move |build| decorators.iter().rev().fold(build, |acc, decorate| decorate(acc)))
}
