use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::build::archive::install_file;
use crate::build::command::run_tool;
use crate::build::{Artifact, BuildConfig, BuildError, Builder, remove_stale};
use crate::context::Context;

const JAR_SKIP_SUFFIXES: &[&str] = &["-sources", "-javadoc", "-original"];

/// Packages a Maven project and installs the resulting jar as the artifact.
#[derive(Debug, Clone)]
pub struct JavaBuilder {
  program: String,
}

impl Default for JavaBuilder {
  fn default() -> Self {
    Self { program: "mvn".into() }
  }
}

impl JavaBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_program(mut self, program: impl Into<String>) -> Self {
    self.program = program.into();
    self
  }
}

/// First jar in `target/` by name that is not a sources, javadoc or shade-original jar.
fn find_jar(target: &Path) -> Result<PathBuf, BuildError> {
  let mut jars: Vec<PathBuf> = std::fs::read_dir(target)
    .map_err(|_| BuildError::NoJarFound(target.to_path_buf()))?
    .filter_map(Result::ok)
    .map(|entry| entry.path())
    .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "jar"))
    .filter(|path| {
      let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
      !JAR_SKIP_SUFFIXES.iter().any(|suffix| stem.ends_with(suffix))
    })
    .collect();
  jars.sort();
  jars.into_iter().next().ok_or_else(|| BuildError::NoJarFound(target.to_path_buf()))
}

#[async_trait]
impl Builder for JavaBuilder {
  async fn build(&self, ctx: &Context, config: &BuildConfig) -> Result<Artifact, BuildError> {
    let output = config.output_or("target/lambda.jar");
    remove_stale(&output)?;
    config.ensure_source_dir()?;
    let source = &config.source_dir;
    if !source.join("pom.xml").is_file() {
      return Err(BuildError::MissingManifest {
        manifest: "pom.xml",
        dir: source.clone(),
      });
    }

    run_tool(
      ctx,
      &self.program,
      &["clean", "package", "-DskipTests"],
      source,
      &[],
      &config.env,
    )
    .await?;

    let jar = find_jar(&source.join("target"))?;
    if jar != output {
      install_file(&jar, &output)?;
    }
    Artifact::from_file(&output)
  }
}
