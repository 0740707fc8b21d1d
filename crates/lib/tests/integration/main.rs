//! Integration tests for forge-lib.

mod build_tests;
mod common;
mod pipeline_tests;
mod provision_tests;
