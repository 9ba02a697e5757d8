// src/models.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::DEFAULT_PATHED_ENV_VARS;

// --- CAPABILITY MODELS ---

/// The four startup flags an interpreter family can honour.
///
/// The same shape is used for the static capability set of a family and for the
/// result of negotiating a concrete startup request against it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Capabilities {
    /// Can source an explicit rc file given by the caller.
    pub rcfile: bool,
    /// Can skip the user's own startup files.
    pub norc: bool,
    /// Can read its commands from a piped standard input.
    pub stdin: bool,
    /// Can run a single command and exit.
    pub command: bool,
}

impl Capabilities {
    /// Builds a capability set from its four flags.
    pub const fn new(rcfile: bool, norc: bool, stdin: bool, command: bool) -> Self {
        Self {
            rcfile,
            norc,
            stdin,
            command,
        }
    }

    /// Keeps only the flags set in both `self` and `other`.
    pub fn intersect(self, other: Capabilities) -> Self {
        Self {
            rcfile: self.rcfile && other.rcfile,
            norc: self.norc && other.norc,
            stdin: self.stdin && other.stdin,
            command: self.command && other.command,
        }
    }

    /// Names of the flags that are set, in declaration order.
    pub fn enabled(&self) -> Vec<&'static str> {
        [
            ("rcfile", self.rcfile),
            ("norc", self.norc),
            ("stdin", self.stdin),
            ("command", self.command),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }
}

// --- `rexsh.toml` MODELS ---

/// Per-family overrides from the `[shells.<family>]` tables.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellConfig {
    /// Absolute path of the interpreter; bypasses the `PATH` search when set.
    pub executable_fullpath: Option<String>,
}

/// Represents the deserialized structure of a `rexsh.toml` file.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RexshConfig {
    /// When false every path conversion is the identity transform.
    pub enable_path_normalization: bool,
    /// A non-empty list replaces system path discovery entirely.
    pub standard_system_paths: Vec<String>,
    /// Globs of variable names whose values are path lists (`*PATH`).
    pub pathed_env_vars: Vec<String>,
    /// Family used when the caller does not name one.
    pub default_shell: Option<String>,
    /// Overrides keyed by family name.
    pub shells: HashMap<String, ShellConfig>,
}

impl Default for RexshConfig {
    fn default() -> Self {
        Self {
            enable_path_normalization: true,
            standard_system_paths: Vec::new(),
            pathed_env_vars: DEFAULT_PATHED_ENV_VARS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_shell: None,
            shells: HashMap::new(),
        }
    }
}

impl RexshConfig {
    /// Returns the configured override for a family, if any.
    pub fn shell(&self, name: &str) -> Option<&ShellConfig> {
        self.shells.get(name)
    }
}
