//! Deploy command integration tests.

#![cfg(unix)]

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn deploy_builds_applies_and_prints_outputs() {
  let env = TestEnv::new();

  env
    .forge_cmd()
    .args(["deploy", "--auto-approve"])
    .assert()
    .success()
    .stdout(predicate::str::contains("[api] Built"))
    .stdout(predicate::str::contains("[terraform] Applied successfully"))
    .stdout(predicate::str::contains("Deployment complete"))
    .stdout(predicate::str::contains("https://api.example.test"));

  assert!(env.path().join(".forge/build/api.zip").is_file());
  assert_eq!(env.terraform_calls(), vec!["init", "plan", "apply", "output"]);
}

#[test]
fn deploy_without_changes_skips_apply() {
  let env = TestEnv::with_cases("  plan) exit 0 ;;");

  env
    .forge_cmd()
    .args(["deploy", "--auto-approve"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No changes to apply"));

  assert_eq!(env.terraform_calls(), vec!["init", "plan", "output"]);
}

#[test]
fn deploy_passes_namespace_to_plan() {
  let env = TestEnv::new();

  env
    .forge_cmd()
    .args(["deploy", "--auto-approve", "--namespace", "pr-42"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Deploying to namespace: pr-42"));

  let log = std::fs::read_to_string(env.path().join("tools/calls.log")).unwrap();
  assert!(log.contains("-var namespace=pr-42-"));
}

#[test]
fn deploy_requires_approval_when_not_interactive() {
  let env = TestEnv::new();

  env
    .forge_cmd()
    .arg("deploy")
    .write_stdin("")
    .assert()
    .failure()
    .stderr(predicate::str::contains("--auto-approve"));

  assert!(env.terraform_calls().is_empty());
}

#[test]
fn failed_apply_reports_stage_and_stderr() {
  let env = TestEnv::with_cases(
    r#"  plan) exit 2 ;;
  apply)
    echo "Error: creating Lambda Function: AccessDenied" >&2
    exit 1 ;;"#,
  );

  env
    .forge_cmd()
    .args(["deploy", "--auto-approve"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Stage 'terraform:apply' failed"));

  assert_eq!(env.terraform_calls(), vec!["init", "plan", "apply"]);
}

#[test]
fn destroy_on_failure_tears_down_after_failed_apply() {
  let env = TestEnv::with_cases(
    r#"  plan) exit 2 ;;
  apply) exit 1 ;;"#,
  );

  env
    .forge_cmd()
    .args(["deploy", "--auto-approve", "--destroy-on-failure"])
    .assert()
    .failure();

  let calls = env.terraform_calls();
  assert_eq!(calls.first().map(String::as_str), Some("init"));
  assert_eq!(calls.last().map(String::as_str), Some("destroy"));
}

#[test]
fn build_failure_stops_before_terraform() {
  let env = TestEnv::new();
  env.write_file(
    "forge.toml",
    "[[functions]]\nname = \"api\"\nruntime = \"python3.12\"\nsource = \"missing\"\n",
  );

  env
    .forge_cmd()
    .args(["deploy", "--auto-approve"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Stage 'build:api' failed"));

  assert!(env.terraform_calls().is_empty());
}
