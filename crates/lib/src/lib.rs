//! forge-lib: execution core for Forge
//!
//! This crate turns a project of cloud-function sources into deployed infrastructure:
//! - `build`: runtime builders, content-addressed caching and build decorators
//! - `provision`: the infrastructure tool wrapper and its failure taxonomy
//! - `pipeline`: immutable state threaded through fail-fast stages with event collection
//! - `deploy`: assembly of build and provisioning stages into deploy/destroy pipelines

pub mod build;
pub mod config;
pub mod consts;
pub mod context;
pub mod deploy;
pub mod discovery;
pub mod pipeline;
pub mod provision;
pub mod util;

pub use context::{Cancelled, Context};
