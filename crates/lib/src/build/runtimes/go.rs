use std::path::Path;

use async_trait::async_trait;

use crate::build::archive::package_zip;
use crate::build::command::run_tool;
use crate::build::{Artifact, BuildConfig, BuildError, Builder, remove_stale};
use crate::context::Context;

/// Cross-compiles a Go function to a static `bootstrap` binary and zips it.
#[derive(Debug, Clone)]
pub struct GoBuilder {
  program: String,
  arch: String,
}

impl Default for GoBuilder {
  fn default() -> Self {
    Self {
      program: "go".into(),
      arch: "amd64".into(),
    }
  }
}

impl GoBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_program(mut self, program: impl Into<String>) -> Self {
    self.program = program.into();
    self
  }

  /// Target architecture (`GOARCH`), `amd64` by default.
  pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
    self.arch = arch.into();
    self
  }
}

/// Package to build: the handler directory when it names one, otherwise the module root.
fn package_arg(config: &BuildConfig) -> String {
  let handler = config.handler.trim_start_matches("./");
  if handler.is_empty() || handler == "bootstrap" || !config.source_dir.join(handler).is_dir() {
    ".".to_string()
  } else {
    format!("./{}", handler)
  }
}

#[async_trait]
impl Builder for GoBuilder {
  async fn build(&self, ctx: &Context, config: &BuildConfig) -> Result<Artifact, BuildError> {
    let output = config.output_or("bootstrap.zip");
    remove_stale(&output)?;
    config.ensure_source_dir()?;

    let staging = tempfile::Builder::new().prefix("forge-go-").tempdir()?;
    let binary = staging.path().join("bootstrap");
    let binary_arg = binary.to_string_lossy();
    let package = package_arg(config);

    run_tool(
      ctx,
      &self.program,
      &[
        "build",
        "-tags",
        "lambda.norpc",
        "-ldflags",
        "-s -w",
        "-o",
        binary_arg.as_ref(),
        package.as_str(),
      ],
      &config.source_dir,
      &[("GOOS", "linux"), ("GOARCH", self.arch.as_str()), ("CGO_ENABLED", "0")],
      &config.env,
    )
    .await?;

    if !binary.is_file() {
      return Err(BuildError::CommandFailed {
        command: format!("{} build", self.program),
        code: Some(0),
        output: "no bootstrap binary was produced".into(),
      });
    }
    mark_executable(&binary)?;

    package_zip(&output, &[staging.path()], None)?;
    Artifact::from_file(&output)
  }
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> std::io::Result<()> {
  use std::os::unix::fs::PermissionsExt;
  std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> std::io::Result<()> {
  Ok(())
}
