//! Registry, decorators and runtime builders driven through the public API.

use std::sync::Arc;

use forge_lib::Context;
use forge_lib::build::runtimes::{GoBuilder, NodeBuilder};
use forge_lib::build::{BuildCache, BuildConfig, BuildError, BuildFn, Builder, Registry, compose, with_cache, with_logging};
use tempfile::TempDir;

use super::common::{write_file, zip_entry_names};

#[tokio::test]
async fn identical_sources_produce_identical_fingerprints() {
  let a = TempDir::new().unwrap();
  let b = TempDir::new().unwrap();
  for root in [a.path(), b.path()] {
    write_file(root, "src/handler.py", "def handler(e, c):\n    return 1\n");
    write_file(root, "src/models/user.py", "class User: pass\n");
  }
  let registry = Registry::with_defaults();

  let first = registry
    .build(
      &Context::new(),
      &BuildConfig::new(a.path().join("src"), a.path().join("out/one.zip"), "python3.11"),
    )
    .await
    .unwrap();
  let second = registry
    .build(
      &Context::new(),
      &BuildConfig::new(b.path().join("src"), b.path().join("elsewhere/two.zip"), "python3.13"),
    )
    .await
    .unwrap();

  assert_ne!(first.path, second.path);
  assert_eq!(first.checksum, second.checksum);
  assert_eq!(first.size, second.size);
}

#[tokio::test]
async fn unknown_runtime_is_rejected() {
  let dir = TempDir::new().unwrap();

  let err = Registry::with_defaults()
    .build(&Context::new(), &BuildConfig::new(dir.path(), "", "ruby3.3"))
    .await
    .unwrap_err();

  assert!(matches!(err, BuildError::UnsupportedRuntime(ref rt) if rt == "ruby3.3"));
}

#[cfg(unix)]
mod toolchains {
  use super::*;
  use crate::common::stub_executable;

  const COUNTING_GO: &str = r#"
echo run >> "$(dirname "$0")/go.calls"
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; fi
  shift
done
printf 'binary' > "$out"
"#;

  const FAILING_NPM: &str = r#"echo "npm ERR! missing script: build" >&2
exit 1"#;

  fn calls(tools: &TempDir) -> usize {
    std::fs::read_to_string(tools.path().join("go.calls"))
      .map(|log| log.lines().count())
      .unwrap_or(0)
  }

  #[tokio::test]
  async fn cached_builder_runs_the_toolchain_once_per_source() {
    let tools = TempDir::new().unwrap();
    let go = stub_executable(tools.path(), "go", COUNTING_GO);
    let project = TempDir::new().unwrap();
    write_file(project.path(), "api/main.go", "package main");

    let go_builder: BuildFn = Arc::new(GoBuilder::new().with_program(go.to_string_lossy()));
    let cache = Arc::new(BuildCache::new());
    let decorate = compose(vec![with_logging(), with_cache(cache.clone())]);
    let registry = Registry::empty().with("provided.al2023", go_builder).decorate(&decorate);
    let config = BuildConfig::new(
      project.path().join("api"),
      project.path().join("build/api.zip"),
      "provided.al2023",
    );

    let first = registry.build(&Context::new(), &config).await.unwrap();
    let second = registry.build(&Context::new(), &config).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(calls(&tools), 1);
    assert_eq!(zip_entry_names(&first.path), vec!["bootstrap"]);

    write_file(project.path(), "api/main.go", "package main // changed");
    registry.build(&Context::new(), &config).await.unwrap();

    assert_eq!(calls(&tools), 2);
    assert_eq!((cache.hits(), cache.misses()), (1, 2));
  }

  #[tokio::test]
  async fn toolchain_failure_carries_output_and_leaves_no_artifact() {
    let tools = TempDir::new().unwrap();
    let npm = stub_executable(tools.path(), "npm", FAILING_NPM);
    let src = TempDir::new().unwrap();
    write_file(src.path(), "package.json", r#"{"name":"api"}"#);
    write_file(src.path(), "index.js", "exports.handler = async () => 1;");
    let output = src.path().join("lambda.zip");
    std::fs::write(&output, "stale artifact").unwrap();

    let err = NodeBuilder::new()
      .with_program(npm.to_string_lossy())
      .build(&Context::new(), &BuildConfig::new(src.path(), "", "nodejs20.x"))
      .await
      .unwrap_err();

    match err {
      BuildError::CommandFailed { code, output, .. } => {
        assert_eq!(code, Some(1));
        assert!(output.contains("missing script: build"));
      }
      other => panic!("unexpected error {other:?}"),
    }
    assert!(!output.exists());
  }

  #[tokio::test]
  async fn cancelled_context_fails_before_spawning() {
    let tools = TempDir::new().unwrap();
    let go = stub_executable(tools.path(), "go", COUNTING_GO);
    let src = TempDir::new().unwrap();
    write_file(src.path(), "main.go", "package main");
    let ctx = Context::new();
    ctx.cancel();

    let err = GoBuilder::new()
      .with_program(go.to_string_lossy())
      .build(&ctx, &BuildConfig::new(src.path(), "", "go1.x"))
      .await
      .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(calls(&tools), 0);
  }
}
