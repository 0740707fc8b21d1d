//! Deployment pipelines.
//!
//! A pipeline threads an immutable [`PipelineState`] through an ordered list of
//! [`Stage`]s. Each stage returns the next state plus progress events; the first
//! failure stops the run and is reported together with every event collected so
//! far and the last good state.
//!
//! # Submodules
//!
//! - [`stages`] - build and provisioning stages

mod error;
mod events;
mod parallel;
mod run;
mod stage;
pub mod stages;
mod state;

pub use error::{PipelineError, RunFailure, StageFailure};
pub use events::{EventLevel, StageEvent, StageResult};
pub use parallel::parallel;
pub use run::{Pipeline, sequential};
pub use stage::{Stage, StageRef, event_stage_fn, stage_fn};
pub use state::PipelineState;
