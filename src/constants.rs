// src/constants.rs

/// The name of the directory holding rexsh configuration (inside the system config dir).
pub const REXSH_CONFIG_DIR: &str = "rexsh";

/// The name of the main configuration file (inside the config directory).
pub const CONFIG_FILENAME: &str = "rexsh.toml";

/// Environment variable that points at an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "REXSH_CONFIG";

/// Prefix for the per-invocation scratch directory holding the context script.
pub const SCRATCH_DIR_PREFIX: &str = "rexsh-";

/// Base name (without extension) of the generated context script.
pub const CONTEXT_SCRIPT_STEM: &str = "context";

/// Sentinel printed in front of `PATH` when asking an interpreter for its default search path.
pub const SYSPATHS_SENTINEL: &str = "__PATHS_";

/// Default globs of variable names whose values are treated as path lists.
pub const DEFAULT_PATHED_ENV_VARS: &[&str] = &["*PATH"];

/// Registry locations holding the persisted `Path` value, machine scope first.
pub const MACHINE_ENVIRONMENT_KEY: &str = r"SYSTEM\CurrentControlSet\Control\Session Manager\Environment";
/// Per-user counterpart of [`MACHINE_ENVIRONMENT_KEY`].
pub const USER_ENVIRONMENT_KEY: &str = "Environment";
