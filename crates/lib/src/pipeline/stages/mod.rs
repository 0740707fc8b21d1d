//! Ready-made stages for building functions and driving the provisioner.
//!
//! Every stage here reports progress through [`StageEvent`](super::StageEvent)s and
//! never prints. Stages that depend on each other talk through the state's config
//! slot: [`list_functions`] feeds [`build_listed`], and [`plan`] feeds [`apply`].

mod build;
mod provision;

pub use build::{build_function, build_listed, list_functions};
pub use provision::{Approval, PlanOutcome, apply, destroy, init, outputs, plan, validate};
