//! Shared utilities: content fingerprints, subprocess execution and test helpers.

pub mod hash;
pub mod process;

#[cfg(test)]
pub mod testutil;
