//! Validate and outputs command integration tests.

#![cfg(unix)]

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn validate_initialises_without_backend() {
  let env = TestEnv::new();

  env
    .forge_cmd()
    .arg("validate")
    .assert()
    .success()
    .stdout(predicate::str::contains("Configuration is valid"));

  let log = std::fs::read_to_string(env.path().join("tools/calls.log")).unwrap();
  assert!(log.lines().next().unwrap().contains("-backend=false"));
  assert_eq!(env.terraform_calls(), vec!["init", "validate"]);
}

#[test]
fn validate_failure_is_reported() {
  let env = TestEnv::with_cases(
    r#"  validate)
    echo "Error: Unsupported argument" >&2
    echo "  on main.tf line 3, in resource \"aws_lambda_function\" \"api\":" >&2
    exit 1 ;;"#,
  );

  env
    .forge_cmd()
    .arg("validate")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Stage 'terraform:validate' failed"));
}

#[test]
fn outputs_as_text() {
  let env = TestEnv::new();

  env
    .forge_cmd()
    .arg("outputs")
    .assert()
    .success()
    .stdout(predicate::str::contains("api_url"))
    .stdout(predicate::str::contains("orders"));
}

#[test]
fn outputs_as_json() {
  let env = TestEnv::new();

  let assert = env.forge_cmd().args(["--output", "json", "outputs"]).assert().success();
  let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
  let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();

  assert_eq!(value["api_url"], "https://api.example.test");
  assert_eq!(value["table"], "orders");
}
