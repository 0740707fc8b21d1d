//! Infrastructure provisioning.
//!
//! [`Provisioner`] is the seam between pipelines and the infrastructure tool.
//! [`TerraformCli`] runs the real binary and classifies its failures into
//! [`ProvisionError`]; [`FakeProvisioner`] is an in-memory stand-in.

mod bootstrap;
mod error;
mod executor;
mod fake;
mod options;
mod terraform;

pub use bootstrap::{apply_bootstrap, destroy_preserving};
pub use error::{ProvisionError, SourceLocation, classify, extract_location, extract_lock_id};
pub use executor::{Operation, Provisioner, ProvisionerRef};
pub use fake::{Call, FakeProvisioner};
pub use options::{
  ApplyConfig, ApplyOption, CommandOption, DestroyConfig, DestroyOption, InitConfig, InitOption, PlanConfig, PlanOption,
  resolve,
};
pub use terraform::{TerraformCli, parse_outputs};
