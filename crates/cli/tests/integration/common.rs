//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Outputs printed by the stub's `output -json`.
pub const OUTPUTS_JSON: &str =
  r#"{"api_url":{"sensitive":false,"type":"string","value":"https://api.example.test"},"table":{"sensitive":false,"type":"string","value":"orders"}}"#;

const CONFIG: &str = r#"
[project]
name = "shop"

[[functions]]
name = "api"
runtime = "python3.12"
"#;

/// A project with one python function, an `infra/` directory and a stub
/// terraform on `FORGE_TERRAFORM_BIN`.
///
/// The stub logs each invocation to `tools/calls.log`. Its plan exits with 2
/// (changes) unless `plan_exit` says otherwise.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self::with_cases("  plan) exit 2 ;;")
  }

  /// `cases` are extra `case "$1"` arms placed before the defaults.
  pub fn with_cases(cases: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let env = Self { temp };
    env.write_file("forge.toml", CONFIG);
    env.write_file("src/functions/api/handler.py", "def handler(event, context):\n  return {}\n");
    std::fs::create_dir_all(env.path().join("infra")).unwrap();
    env.install_terraform(cases);
    env
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  fn terraform_path(&self) -> PathBuf {
    self.path().join("tools").join("terraform")
  }

  #[cfg(unix)]
  fn install_terraform(&self, cases: &str) {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
      "#!/bin/sh\necho \"$*\" >> \"$(dirname \"$0\")/calls.log\"\ncase \"$1\" in\n{}\n  output) echo '{}' ;;\n  *) exit 0 ;;\nesac\n",
      cases, OUTPUTS_JSON
    );
    self.write_file("tools/terraform", &script);
    std::fs::set_permissions(self.terraform_path(), std::fs::Permissions::from_mode(0o755)).unwrap();
  }

  #[cfg(not(unix))]
  fn install_terraform(&self, _cases: &str) {}

  /// Subcommands the stub was invoked with, in order.
  pub fn terraform_calls(&self) -> Vec<String> {
    std::fs::read_to_string(self.path().join("tools/calls.log"))
      .unwrap_or_default()
      .lines()
      .filter_map(|line| line.split_whitespace().next().map(str::to_string))
      .collect()
  }

  /// A `forge` command rooted at the project with the stub terraform.
  pub fn forge_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("forge");
    cmd.arg("-C").arg(self.path());
    cmd.env("FORGE_TERRAFORM_BIN", self.terraform_path());
    cmd.env_remove("FORGE_REGION");
    cmd
  }
}
