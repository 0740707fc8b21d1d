//! `TerraformCli` against stub binaries.

#![cfg(unix)]

use std::path::PathBuf;

use forge_lib::Context;
use forge_lib::provision::{
  ApplyOption, InitOption, PlanOption, ProvisionError, Provisioner, TerraformCli, apply_bootstrap,
};
use serde_json::json;
use tempfile::TempDir;

use crate::common::stub_executable;

/// A terraform stand-in whose behaviour per subcommand is chosen by the test.
///
/// Every invocation appends its arguments to `calls.log` next to the script.
struct StubTerraform {
  tools: TempDir,
  infra: TempDir,
  binary: PathBuf,
}

impl StubTerraform {
  fn new(cases: &str) -> Self {
    let tools = TempDir::new().unwrap();
    let infra = TempDir::new().unwrap();
    let body = format!(
      "echo \"$*\" >> \"$(dirname \"$0\")/calls.log\"\ncase \"$1\" in\n{}\n  *) exit 0 ;;\nesac",
      cases
    );
    let binary = stub_executable(tools.path(), "terraform", &body);
    Self { tools, infra, binary }
  }

  fn cli(&self) -> TerraformCli {
    TerraformCli::new(&self.binary)
  }

  fn calls(&self) -> Vec<String> {
    std::fs::read_to_string(self.tools.path().join("calls.log"))
      .unwrap_or_default()
      .lines()
      .map(str::to_string)
      .collect()
  }
}

#[tokio::test]
async fn plan_exit_codes_map_to_change_detection() {
  let changes = StubTerraform::new("  plan) exit 2 ;;");
  let clean = StubTerraform::new("  plan) exit 0 ;;");

  assert!(changes.cli().plan(&Context::new(), changes.infra.path(), vec![]).await.unwrap());
  assert!(!clean.cli().plan(&Context::new(), clean.infra.path(), vec![]).await.unwrap());
  assert_eq!(changes.calls(), vec!["plan -input=false -no-color -detailed-exitcode"]);
}

#[tokio::test]
async fn plans_after_apply_report_no_changes() {
  let stub = StubTerraform::new(
    r#"  plan) [ -f "$(dirname "$0")/applied" ] && exit 0; exit 2 ;;
  apply) touch "$(dirname "$0")/applied" ;;"#,
  );
  let cli = stub.cli();
  let ctx = Context::new();
  let dir = stub.infra.path();

  assert!(cli.plan(&ctx, dir, vec![]).await.unwrap());
  cli.apply(&ctx, dir, vec![ApplyOption::AutoApprove(true)]).await.unwrap();
  assert!(!cli.plan(&ctx, dir, vec![]).await.unwrap());
  assert!(!cli.plan(&ctx, dir, vec![]).await.unwrap());
}

#[tokio::test]
async fn lock_contention_is_classified_with_its_id() {
  let stub = StubTerraform::new(
    r#"  init)
    echo "Error: Error acquiring the state lock" >&2
    echo "" >&2
    echo "Lock Info:" >&2
    echo "  ID:        xyz-123" >&2
    echo "  Operation: OperationTypeApply" >&2
    exit 1 ;;"#,
  );

  let err = stub
    .cli()
    .init(&Context::new(), stub.infra.path(), vec![InitOption::Upgrade(true)])
    .await
    .unwrap_err();

  assert!(matches!(err, ProvisionError::StateLocked { .. }));
  assert_eq!(err.lock_id(), Some("xyz-123"));
  assert_eq!(stub.calls(), vec!["init -input=false -no-color -upgrade"]);
}

#[tokio::test]
async fn unrecognised_failure_keeps_exit_code_and_stderr() {
  let stub = StubTerraform::new(
    r#"  apply)
    echo "Error: creating Lambda Function: AccessDenied" >&2
    exit 7 ;;"#,
  );

  let err = stub
    .cli()
    .apply(&Context::new(), stub.infra.path(), vec![ApplyOption::AutoApprove(true)])
    .await
    .unwrap_err();

  match err {
    ProvisionError::Exit {
      command,
      exit_code,
      stderr,
      ..
    } => {
      assert_eq!(command, "apply");
      assert_eq!(exit_code, 7);
      assert!(stderr.contains("AccessDenied"));
    }
    other => panic!("unexpected error {other:?}"),
  }
}

#[tokio::test]
async fn validation_errors_carry_their_location() {
  let stub = StubTerraform::new(
    r#"  validate)
    echo "Error: Unsupported argument" >&2
    echo "" >&2
    echo "  on main.tf line 12, in resource \"aws_lambda_function\" \"api\":" >&2
    exit 1 ;;"#,
  );

  let err = stub.cli().validate(&Context::new(), stub.infra.path()).await.unwrap_err();

  match err {
    ProvisionError::Validation { location, .. } => {
      let location = location.expect("location parsed");
      assert_eq!(location.file, "main.tf");
      assert_eq!(location.line, 12);
    }
    other => panic!("unexpected error {other:?}"),
  }
}

#[tokio::test]
async fn outputs_are_decoded_by_name() {
  let stub = StubTerraform::new(
    r#"  output)
    echo '{"api_url":{"sensitive":false,"type":"string","value":"https://x.test"},"ids":{"sensitive":false,"type":["list","number"],"value":[1,2]}}'
    exit 0 ;;"#,
  );

  let outputs = stub.cli().outputs(&Context::new(), stub.infra.path()).await.unwrap();

  assert_eq!(outputs.len(), 2);
  assert_eq!(outputs["api_url"], json!("https://x.test"));
  assert_eq!(outputs["ids"], json!([1, 2]));
  assert_eq!(stub.calls(), vec!["output -json -no-color"]);
}

#[tokio::test]
async fn plan_options_reach_the_command_line() {
  let stub = StubTerraform::new("  plan) exit 0 ;;");

  stub
    .cli()
    .plan(
      &Context::new(),
      stub.infra.path(),
      vec![
        PlanOption::Var("namespace".into(), "pr-1-".into()),
        PlanOption::Out("tfplan".into()),
        PlanOption::Out("final.tfplan".into()),
      ],
    )
    .await
    .unwrap();

  assert_eq!(
    stub.calls(),
    vec!["plan -input=false -no-color -detailed-exitcode -out=final.tfplan -var namespace=pr-1-"]
  );
}

#[tokio::test]
async fn bootstrap_applies_saved_plan_only_when_needed() {
  let stub = StubTerraform::new("  plan) exit 2 ;;");

  assert!(apply_bootstrap(&stub.cli(), &Context::new(), stub.infra.path()).await.unwrap());

  let plan_file = stub.infra.path().join("tfplan");
  assert_eq!(
    stub.calls(),
    vec![
      "init -input=false -no-color".to_string(),
      format!("plan -input=false -no-color -detailed-exitcode -out={}", plan_file.display()),
      format!("apply -input=false -no-color -auto-approve {}", plan_file.display()),
    ]
  );
}
