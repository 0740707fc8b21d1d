use async_trait::async_trait;
use tracing::debug;

use crate::build::archive::package_zip;
use crate::build::command::run_tool;
use crate::build::{Artifact, BuildConfig, BuildError, Builder, remove_stale};
use crate::context::Context;

/// Vendors `requirements.txt` into a staging directory and zips it with the sources.
///
/// Source files take precedence over vendored files with the same path.
#[derive(Debug, Clone)]
pub struct PythonBuilder {
  program: String,
}

impl Default for PythonBuilder {
  fn default() -> Self {
    Self { program: "pip".into() }
  }
}

impl PythonBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_program(mut self, program: impl Into<String>) -> Self {
    self.program = program.into();
    self
  }
}

#[async_trait]
impl Builder for PythonBuilder {
  async fn build(&self, ctx: &Context, config: &BuildConfig) -> Result<Artifact, BuildError> {
    let output = config.output_or("lambda.zip");
    remove_stale(&output)?;
    config.ensure_source_dir()?;
    let source = &config.source_dir;

    let deps = tempfile::Builder::new().prefix("forge-py-").tempdir()?;
    let requirements = source.join("requirements.txt");
    if requirements.is_file() {
      let requirements_arg = requirements.to_string_lossy();
      let target_arg = deps.path().to_string_lossy();
      run_tool(
        ctx,
        &self.program,
        &[
          "install",
          "-r",
          requirements_arg.as_ref(),
          "-t",
          target_arg.as_ref(),
          "--upgrade",
        ],
        source,
        &[],
        &config.env,
      )
      .await?;
    } else {
      debug!(source = %source.display(), "no requirements.txt, packaging sources only");
    }

    package_zip(&output, &[deps.path(), source.as_path()], Some(&output))?;
    Artifact::from_file(&output)
  }
}
