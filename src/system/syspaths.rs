// src/system/syspaths.rs

//! Discovery of a family's system path baseline: the search path a fresh interpreter
//! would get before any rc file or caller environment touched it.

use crate::{
    constants::SYSPATHS_SENTINEL,
    core::paths,
    shells::{Shell, ShellKind},
    system::env_store::{EnvironmentStore, Scope},
};
use std::collections::HashSet;
use std::path::Path;
use std::process::{Command, Stdio};

/// Name of the persisted search path value in the OS store.
const STORE_PATH_NAME: &str = "Path";

/// Computes the baseline of `shell`.
///
/// A non-empty `configured` list is returned as is. Otherwise the OS store entries come
/// first, followed by what a spawned interpreter reports when started without `PATH`.
/// `cmd` relies on the store alone.
pub fn discover(shell: &Shell, store: &dyn EnvironmentStore, configured: &[String]) -> Vec<String> {
    if !configured.is_empty() {
        log::debug!(
            "Using configured standard_system_paths for '{}'.",
            shell.name()
        );
        return configured.to_vec();
    }

    let from_store: Vec<String> = query_store(store)
        .iter()
        .map(|entry| shell.normalize_path(entry))
        .collect();
    let spawned = match shell.kind() {
        ShellKind::Cmd => Vec::new(),
        _ => spawn_for_paths(shell),
    };
    let merged = merge_system_paths(&from_store, &spawned);
    log::debug!("System paths for '{}': {:?}", shell.name(), merged);
    merged
}

/// Reads the persisted `Path` from the machine scope, then the user scope.
///
/// `%NAME%` references are expanded and the values split on `;`. Absent scopes are
/// skipped.
pub fn query_store(store: &dyn EnvironmentStore) -> Vec<String> {
    Scope::ALL
        .iter()
        .filter_map(|scope| store.query(*scope, STORE_PATH_NAME))
        .flat_map(|value| {
            paths::expand_windows_vars(&value)
                .split(';')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Concatenates the store entries and the spawned entries, keeping the first occurrence
/// of every path and dropping empty ones.
pub fn merge_system_paths(store: &[String], spawned: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    store
        .iter()
        .chain(spawned)
        .filter(|entry| !entry.is_empty())
        .filter(|entry| seen.insert(entry.as_str()))
        .cloned()
        .collect()
}

/// Finds the sentinel-tagged line in an interpreter's output and splits what follows it.
pub fn parse_sentinel_output(output: &str, kind: ShellKind) -> Vec<String> {
    let Some(line) = output
        .lines()
        .find_map(|line| line.trim_start().strip_prefix(SYSPATHS_SENTINEL))
    else {
        return Vec::new();
    };
    let value = line.trim();
    if kind == ShellKind::GitBash {
        return paths::split_path_list(value, ':');
    }
    let separator = kind.pathsep();
    value
        .split(separator)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// The command that prints the sentinel line. `PATH` and the variables naming startup
/// files are removed so nothing but the interpreter's own defaults shape the output.
fn sentinel_command(kind: ShellKind, exe: &Path) -> Command {
    let mut command = Command::new(exe);
    match kind {
        ShellKind::PowerShell | ShellKind::Pwsh => {
            command.args([
                "-NoProfile",
                "-NonInteractive",
                "-Command",
                &format!("Write-Output ('{} ' + $Env:PATH)", SYSPATHS_SENTINEL),
            ]);
        }
        _ => {
            command.args(["-c", &format!("echo {} $PATH", SYSPATHS_SENTINEL)]);
        }
    }
    command
        .env_remove("PATH")
        .env_remove("BASH_ENV")
        .env_remove("ENV")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    command
}

fn spawn_for_paths(shell: &Shell) -> Vec<String> {
    let Some(exe) = shell.locate_executable(false) else {
        log::debug!(
            "'{}' not found; skipping spawned system path discovery.",
            shell.name()
        );
        return Vec::new();
    };

    let mut command = sentinel_command(shell.kind(), &exe);
    match command.output() {
        Ok(output) => parse_sentinel_output(&String::from_utf8_lossy(&output.stdout), shell.kind()),
        Err(e) => {
            log::warn!(
                "Could not run '{}' to discover system paths: {}",
                exe.display(),
                e
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::RexshConfig, system::env_store::StaticStore, system::registry::ShellRegistry};

    #[test]
    fn test_merge_keeps_store_order_and_dedups() {
        let store = vec!["P1".to_string()];
        let spawned = vec!["P1".to_string(), "P2".to_string(), String::new()];
        assert_eq!(merge_system_paths(&store, &spawned), vec!["P1", "P2"]);
    }

    #[test]
    fn test_query_store_machine_then_user() {
        let store = StaticStore::default()
            .with(Scope::User, "Path", r"C:\Users\me\bin;")
            .with(Scope::Machine, "Path", r"C:\Windows; C:\Windows\System32");
        assert_eq!(
            query_store(&store),
            vec![r"C:\Windows", r"C:\Windows\System32", r"C:\Users\me\bin"]
        );
    }

    #[test]
    fn test_parse_sentinel_output() {
        let out = "noise from a profile\n__PATHS_ /usr/bin:/bin\n";
        assert_eq!(parse_sentinel_output(out, ShellKind::Bash), vec!["/usr/bin", "/bin"]);
        assert!(parse_sentinel_output("nothing here", ShellKind::Bash).is_empty());
        assert_eq!(
            parse_sentinel_output("__PATHS_ C:\\Windows;C:\\Tools\r\n", ShellKind::PowerShell),
            vec![r"C:\Windows", r"C:\Tools"]
        );
    }

    #[test]
    fn test_sentinel_command_drops_startup_variables() {
        let command = sentinel_command(ShellKind::Bash, Path::new("/bin/bash"));
        let removed: Vec<String> = command
            .get_envs()
            .filter(|(_, value)| value.is_none())
            .map(|(key, _)| key.to_string_lossy().into_owned())
            .collect();
        for key in ["PATH", "BASH_ENV", "ENV"] {
            assert!(removed.iter().any(|k| k == key), "{} should be removed", key);
        }
        let args: Vec<String> = command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["-c".to_string(), format!("echo {} $PATH", SYSPATHS_SENTINEL)]);
    }

    #[test]
    fn test_configured_paths_short_circuit() {
        let config = RexshConfig {
            standard_system_paths: vec!["/opt/only".to_string()],
            ..RexshConfig::default()
        };
        let registry = ShellRegistry::with_store(
            config,
            Box::new(StaticStore::default().with(Scope::Machine, "Path", r"C:\ignored")),
        );
        let shell = registry.shell_of(ShellKind::Sh);
        assert_eq!(shell.system_paths(), vec!["/opt/only"]);
    }
}
