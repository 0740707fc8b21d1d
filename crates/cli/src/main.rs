mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::{Global, cmd_build, cmd_deploy, cmd_destroy, cmd_outputs, cmd_validate};
use crate::output::OutputFormat;

/// forge - build and deploy serverless functions
#[derive(Parser)]
#[command(name = "forge")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Project directory (default: current directory)
  #[arg(short = 'C', long, global = true, default_value = ".")]
  project: PathBuf,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short = 'o', long, global = true, value_enum, default_value = "text")]
  output: OutputFormat,

  /// Cancel the command after this long (e.g., "90s", "15m")
  #[arg(long, global = true, value_parser = humantime::parse_duration)]
  timeout: Option<Duration>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build every function declared in forge.toml
  Build {
    /// Build functions concurrently
    #[arg(long)]
    parallel: bool,
  },

  /// Build functions and apply the infrastructure
  Deploy {
    /// Prefix resource names with this namespace (e.g., a PR number)
    #[arg(long)]
    namespace: Option<String>,

    /// Apply without asking for confirmation
    #[arg(long)]
    auto_approve: bool,

    /// Build functions concurrently
    #[arg(long)]
    parallel: bool,

    /// Save the plan and apply exactly that plan
    #[arg(long)]
    save_plan: bool,

    /// Destroy the infrastructure again if the apply fails
    #[arg(long)]
    destroy_on_failure: bool,
  },

  /// Destroy the infrastructure
  Destroy {
    /// Namespace used when deploying
    #[arg(long)]
    namespace: Option<String>,

    /// Destroy without asking for confirmation
    #[arg(long)]
    auto_approve: bool,
  },

  /// Validate the infrastructure configuration
  Validate,

  /// Print infrastructure outputs
  Outputs,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let global = Global {
    project: cli.project,
    output: cli.output,
    timeout: cli.timeout,
  };

  match cli.command {
    Commands::Build { parallel } => cmd_build(&global, parallel),
    Commands::Deploy {
      namespace,
      auto_approve,
      parallel,
      save_plan,
      destroy_on_failure,
    } => cmd_deploy(
      &global,
      cmd::DeployArgs {
        namespace,
        auto_approve,
        parallel,
        save_plan,
        destroy_on_failure,
      },
    ),
    Commands::Destroy {
      namespace,
      auto_approve,
    } => cmd_destroy(&global, namespace, auto_approve),
    Commands::Validate => cmd_validate(&global),
    Commands::Outputs => cmd_outputs(&global),
  }
}
