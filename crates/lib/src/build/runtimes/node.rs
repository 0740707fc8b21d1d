use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::build::archive::package_zip;
use crate::build::command::run_tool;
use crate::build::{Artifact, BuildConfig, BuildError, Builder, remove_stale};
use crate::context::Context;

/// Installs dependencies with npm and zips the function directory.
///
/// TypeScript projects (a `tsconfig.json` plus a `build` script) get a full install
/// followed by `npm run build`; everything else gets a production-only install.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
  program: String,
}

impl Default for NodeBuilder {
  fn default() -> Self {
    Self { program: "npm".into() }
  }
}

impl NodeBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_program(mut self, program: impl Into<String>) -> Self {
    self.program = program.into();
    self
  }
}

#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
  #[serde(default)]
  scripts: BTreeMap<String, String>,
}

fn read_manifest(path: &Path) -> Result<PackageManifest, BuildError> {
  let content = std::fs::read_to_string(path)?;
  serde_json::from_str(&content).map_err(|source| BuildError::InvalidManifest {
    path: path.to_path_buf(),
    source,
  })
}

#[async_trait]
impl Builder for NodeBuilder {
  async fn build(&self, ctx: &Context, config: &BuildConfig) -> Result<Artifact, BuildError> {
    let output = config.output_or("lambda.zip");
    remove_stale(&output)?;
    config.ensure_source_dir()?;
    let source = &config.source_dir;

    let package_json = source.join("package.json");
    if package_json.is_file() {
      let manifest = read_manifest(&package_json)?;
      let typescript = source.join("tsconfig.json").is_file() && manifest.scripts.contains_key("build");
      if typescript {
        run_tool(ctx, &self.program, &["install"], source, &[], &config.env).await?;
        run_tool(ctx, &self.program, &["run", "build"], source, &[], &config.env).await?;
      } else {
        run_tool(ctx, &self.program, &["install", "--production"], source, &[], &config.env).await?;
      }
    } else {
      debug!(source = %source.display(), "no package.json, skipping npm install");
    }

    package_zip(&output, &[source.as_path()], Some(&output))?;
    Artifact::from_file(&output)
  }
}
