//! Destroy command integration tests.

#![cfg(unix)]

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn destroy_with_auto_approve() {
  let env = TestEnv::new();

  env
    .forge_cmd()
    .args(["destroy", "--auto-approve"])
    .assert()
    .success()
    .stdout(predicate::str::contains("[terraform] Destroyed"))
    .stdout(predicate::str::contains("Destroy complete"));

  assert_eq!(env.terraform_calls(), vec!["init", "destroy"]);
}

#[test]
fn destroy_needs_confirmation() {
  let env = TestEnv::new();

  env
    .forge_cmd()
    .arg("destroy")
    .write_stdin("")
    .assert()
    .failure()
    .stderr(predicate::str::contains("non-interactive"));

  assert!(env.terraform_calls().is_empty());
}

#[test]
fn destroy_passes_namespace() {
  let env = TestEnv::new();

  env
    .forge_cmd()
    .args(["destroy", "--auto-approve", "--namespace", "pr-7"])
    .assert()
    .success();

  let log = std::fs::read_to_string(env.path().join("tools/calls.log")).unwrap();
  assert!(log.contains("namespace=pr-7-"));
}
