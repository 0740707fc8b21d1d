//! Shared constants.

/// Project configuration file looked up in the project root.
pub const CONFIG_FILE: &str = "forge.toml";

/// Where artifacts are written, relative to the project root.
pub const DEFAULT_BUILD_DIR: &str = ".forge/build";

/// Where the infrastructure configuration lives, relative to the project root.
pub const DEFAULT_INFRA_DIR: &str = "infra";

/// Parent of per-function source directories when a function omits `source`.
pub const DEFAULT_FUNCTIONS_DIR: &str = "src/functions";

/// Default infrastructure tool binary.
pub const DEFAULT_TERRAFORM_BIN: &str = "terraform";

/// Saved plan file name used by bootstrap and `save_plan` deploys.
pub const PLAN_FILE_NAME: &str = "tfplan";

/// File and directory name suffixes never packaged into an archive.
pub const PACKAGE_SKIP_SUFFIXES: &[&str] = &[".pyc", ".pyo", ".pyd", "__pycache__", ".git", ".DS_Store"];

/// Environment override for the infrastructure tool binary.
pub const ENV_TERRAFORM_BIN: &str = "FORGE_TERRAFORM_BIN";

/// Environment override for the project region.
pub const ENV_REGION: &str = "FORGE_REGION";
