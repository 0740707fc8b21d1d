//! Function builds.
//!
//! A build turns a function's source directory into a single deployable artifact
//! (a zip archive or a jar). Builds are values: every builder implements [`Builder`],
//! and cross-cutting behavior (caching, logging) is layered on as decorators
//! rather than baked into the builders.
//!
//! # Submodules
//!
//! - [`archive`] - deterministic zip packaging
//! - [`cache`] - content-addressed build cache
//! - [`decorate`] - cache and logging decorators and their composition
//! - [`registry`] - runtime identifier to builder lookup
//! - [`runtimes`] - Go, Node.js, Python and Java builders

pub mod archive;
pub mod cache;
mod command;
pub mod decorate;
pub mod registry;
pub mod runtimes;
mod types;

pub use cache::{BuildCache, CacheKey};
pub use decorate::{Decorator, compose, with_cache, with_logging};
pub use registry::Registry;
pub use types::*;
