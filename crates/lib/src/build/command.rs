use std::collections::BTreeMap;
use std::path::Path;

use tokio::process::Command;
use tracing::info;

use super::BuildError;
use crate::context::Context;
use crate::util::process::run_process;

/// Run one toolchain step in `cwd`.
///
/// `defaults` is applied first and `env` second, so per-function environment
/// overrides toolchain defaults such as `GOARCH`. Returns stdout on success.
pub(crate) async fn run_tool(
  ctx: &Context,
  program: &str,
  args: &[&str],
  cwd: &Path,
  defaults: &[(&str, &str)],
  env: &BTreeMap<String, String>,
) -> Result<String, BuildError> {
  let command_line = std::iter::once(program).chain(args.iter().copied()).collect::<Vec<_>>().join(" ");
  info!(command = %command_line, cwd = %cwd.display(), "running toolchain");

  let mut command = Command::new(program);
  command.args(args).current_dir(cwd);
  for (key, value) in defaults {
    command.env(key, value);
  }
  command.envs(env);

  let output = run_process(ctx, command).await?;
  if !output.success() {
    return Err(BuildError::CommandFailed {
      command: command_line,
      code: output.code,
      output: output.combined(),
    });
  }
  Ok(output.stdout)
}
