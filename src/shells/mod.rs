// src/shells/mod.rs

//! The interpreter families rexsh can drive, and the [`Shell`] handle tying a family's
//! grammar, capabilities and executable together.

pub mod cmd;
pub mod posix;
pub mod powershell;

use crate::{
    core::{
        compiler::{self, CompileOptions, Dialect, Side},
        paths::{PathNormalizer, PathStyle},
        rex::{ActionList, RexString},
    },
    models::{Capabilities, RexshConfig},
    system::registry::ShellRegistry,
};
use cmd::CmdDialect;
use posix::PosixDialect;
use powershell::PowerShellDialect;
use serde::{Deserialize, Serialize};
use std::{env, fmt, path::PathBuf, str::FromStr};
use thiserror::Error;

/// Errors raised while selecting or locating a shell.
#[derive(Error, Debug)]
pub enum ShellError {
    /// The requested family name is not one rexsh knows.
    #[error("Unknown shell '{0}'. Known shells: {known}.", known = ShellKind::names().join(", "))]
    UnknownShell(String),
    /// The family is known but its interpreter could not be found.
    #[error("Could not find an executable for shell '{0}'.")]
    ExecutableNotFound(String),
}

/// The closed set of interpreter families.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ShellKind {
    /// The POSIX `sh`.
    Sh,
    /// GNU bash.
    Bash,
    /// The Z shell.
    Zsh,
    /// bash from Git for Windows (MSYS), a POSIX shell on top of Windows paths.
    GitBash,
    /// `cmd.exe`.
    Cmd,
    /// Windows PowerShell 5.x.
    PowerShell,
    /// PowerShell Core.
    Pwsh,
}

impl ShellKind {
    /// Every family, in display order.
    pub const ALL: [ShellKind; 7] = [
        ShellKind::Sh,
        ShellKind::Bash,
        ShellKind::Zsh,
        ShellKind::GitBash,
        ShellKind::Cmd,
        ShellKind::PowerShell,
        ShellKind::Pwsh,
    ];

    /// The family name used in configuration and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            ShellKind::Sh => "sh",
            ShellKind::Bash => "bash",
            ShellKind::Zsh => "zsh",
            ShellKind::GitBash => "gitbash",
            ShellKind::Cmd => "cmd",
            ShellKind::PowerShell => "powershell",
            ShellKind::Pwsh => "pwsh",
        }
    }

    /// Names of every family.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.name()).collect()
    }

    /// Families that can run on the host platform.
    pub fn native() -> Vec<ShellKind> {
        Self::ALL
            .into_iter()
            .filter(|kind| kind.is_native())
            .collect()
    }

    /// True unless the family only exists on Windows and this is not Windows.
    pub fn is_native(self) -> bool {
        match self {
            ShellKind::GitBash | ShellKind::Cmd | ShellKind::PowerShell => cfg!(windows),
            _ => true,
        }
    }

    /// True for the Bourne-style families, Git Bash included.
    pub fn is_posix(self) -> bool {
        matches!(
            self,
            ShellKind::Sh | ShellKind::Bash | ShellKind::Zsh | ShellKind::GitBash
        )
    }

    /// The file name searched for on `PATH`.
    pub fn executable_name(self) -> &'static str {
        match self {
            ShellKind::Sh => "sh",
            ShellKind::Bash | ShellKind::GitBash => "bash",
            ShellKind::Zsh => "zsh",
            ShellKind::Cmd => "cmd",
            ShellKind::PowerShell => "powershell",
            ShellKind::Pwsh => "pwsh",
        }
    }

    /// Extension of scripts the interpreter runs.
    pub fn file_extension(self) -> &'static str {
        match self {
            ShellKind::Cmd => "bat",
            ShellKind::PowerShell | ShellKind::Pwsh => "ps1",
            _ => "sh",
        }
    }

    /// The native list separator.
    pub fn pathsep(self) -> &'static str {
        match self {
            ShellKind::Cmd | ShellKind::PowerShell => ";",
            ShellKind::Pwsh if cfg!(windows) => ";",
            _ => ":",
        }
    }

    /// The static startup capabilities of the family.
    pub fn capabilities(self) -> Capabilities {
        match self {
            ShellKind::Sh => Capabilities::new(false, false, true, true),
            ShellKind::Bash | ShellKind::GitBash => Capabilities::new(true, true, true, true),
            ShellKind::Zsh => Capabilities::new(false, true, true, true),
            ShellKind::Cmd | ShellKind::PowerShell | ShellKind::Pwsh => {
                Capabilities::new(false, true, false, true)
            }
        }
    }

    /// The grammar paths must be converted into, if any.
    pub fn path_style(self) -> Option<PathStyle> {
        match self {
            ShellKind::GitBash => Some(PathStyle::Posix),
            ShellKind::Cmd | ShellKind::PowerShell => Some(PathStyle::Windows),
            ShellKind::Pwsh if cfg!(windows) => Some(PathStyle::Windows),
            _ => None,
        }
    }

    /// The user rc files, relative to the home directory, that an interactive session
    /// of this family reads on its own.
    pub fn startup_files(self) -> &'static [&'static str] {
        match self {
            ShellKind::Sh => &[".profile"],
            ShellKind::Bash | ShellKind::GitBash => &[".bashrc"],
            ShellKind::Zsh => &[".zshrc"],
            ShellKind::Cmd | ShellKind::PowerShell | ShellKind::Pwsh => &[],
        }
    }

    /// The flag that skips the user's startup files.
    pub fn norc_flag(self) -> Option<&'static str> {
        match self {
            ShellKind::Sh => None,
            ShellKind::Bash | ShellKind::GitBash => Some("--norc"),
            ShellKind::Zsh => Some("--no-rcs"),
            ShellKind::Cmd => Some("/D"),
            ShellKind::PowerShell | ShellKind::Pwsh => Some("-NoProfile"),
        }
    }
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShellKind {
    type Err = ShellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ShellKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| ShellError::UnknownShell(s.to_string()))
    }
}

/// The family used when neither the caller nor the configuration names one.
///
/// On Windows this is `cmd`. Elsewhere it is the family of the user's `$SHELL` when
/// rexsh knows it, and `bash` otherwise.
pub fn default_shell_kind() -> ShellKind {
    if cfg!(windows) {
        return ShellKind::Cmd;
    }
    env::var("SHELL")
        .ok()
        .and_then(|shell| {
            PathBuf::from(shell)
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.parse::<ShellKind>().ok())
        })
        .filter(|kind| kind.is_native())
        .unwrap_or(ShellKind::Bash)
}

// --- BACKENDS ---

/// The grammar of one family, as a closed set of variants sharing the [`Dialect`]
/// interface.
#[derive(Debug, Clone)]
pub enum Backend {
    /// sh, bash, zsh, gitbash.
    Posix(PosixDialect),
    /// cmd.
    Cmd(CmdDialect),
    /// powershell, pwsh.
    PowerShell(PowerShellDialect),
}

impl Backend {
    /// The backend rendering scripts for `kind`.
    pub fn for_kind(kind: ShellKind) -> Self {
        match kind {
            ShellKind::Sh | ShellKind::Bash | ShellKind::Zsh | ShellKind::GitBash => {
                Backend::Posix(PosixDialect::new(kind))
            }
            ShellKind::Cmd => Backend::Cmd(CmdDialect::new()),
            ShellKind::PowerShell | ShellKind::Pwsh => {
                Backend::PowerShell(PowerShellDialect::new(kind.pathsep()))
            }
        }
    }

    fn inner(&self) -> &dyn Dialect {
        match self {
            Backend::Posix(d) => d,
            Backend::Cmd(d) => d,
            Backend::PowerShell(d) => d,
        }
    }
}

impl Dialect for Backend {
    fn pathsep(&self) -> &str {
        self.inner().pathsep()
    }
    fn key_token(&self, key: &str) -> String {
        self.inner().key_token(key)
    }
    fn all_key_tokens(&self, key: &str) -> Vec<String> {
        self.inner().all_key_tokens(key)
    }
    fn shebang(&self) -> String {
        self.inner().shebang()
    }
    fn setenv(&self, key: &str, value: &RexString) -> String {
        self.inner().setenv(key, value)
    }
    fn unsetenv(&self, key: &str) -> String {
        self.inner().unsetenv(key)
    }
    fn pend(
        &self,
        key: &str,
        value: &RexString,
        separator: &str,
        side: Side,
        guarded: bool,
    ) -> String {
        self.inner().pend(key, value, separator, side, guarded)
    }
    fn alias(&self, name: &str, command: &str) -> String {
        self.inner().alias(name, command)
    }
    fn comment(&self, text: &str) -> String {
        self.inner().comment(text)
    }
    fn info(&self, value: &RexString) -> String {
        self.inner().info(value)
    }
    fn error(&self, value: &RexString) -> String {
        self.inner().error(value)
    }
    fn source(&self, path: &RexString) -> String {
        self.inner().source(path)
    }
}

// --- SHELL HANDLE ---

/// A configured interpreter family.
///
/// Obtained from [`ShellRegistry::create_shell`]. Cloning is cheap apart from the compile
/// options; the system path cache is shared through the registry.
#[derive(Debug, Clone)]
pub struct Shell {
    kind: ShellKind,
    backend: Backend,
    options: CompileOptions,
    executable_override: Option<PathBuf>,
    registry: ShellRegistry,
}

impl Shell {
    pub(crate) fn new(kind: ShellKind, config: &RexshConfig, registry: ShellRegistry) -> Self {
        let normalizer = PathNormalizer::new(config.enable_path_normalization, kind.path_style());
        let executable_override = config
            .shell(kind.name())
            .and_then(|shell| shell.executable_fullpath.as_deref())
            .map(|path| match shellexpand::full(path) {
                Ok(expanded) => PathBuf::from(expanded.into_owned()),
                Err(e) => {
                    log::warn!("Could not expand executable_fullpath '{}': {}", path, e);
                    PathBuf::from(shellexpand::tilde(path).into_owned())
                }
            });
        Self {
            kind,
            backend: Backend::for_kind(kind),
            options: CompileOptions::from_config(config, normalizer),
            executable_override,
            registry,
        }
    }

    /// The family.
    pub fn kind(&self) -> ShellKind {
        self.kind
    }

    /// The family name.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// The file name searched for on `PATH`.
    pub fn executable_name(&self) -> &'static str {
        self.kind.executable_name()
    }

    /// Extension of scripts this shell runs.
    pub fn file_extension(&self) -> &'static str {
        self.kind.file_extension()
    }

    /// The native list separator.
    pub fn pathsep(&self) -> &'static str {
        self.kind.pathsep()
    }

    /// The static capability set.
    pub fn capabilities(&self) -> Capabilities {
        self.kind.capabilities()
    }

    /// The grammar backend.
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Negotiates a startup request against the family's capabilities.
    ///
    /// Unsupported flags are dropped with a warning. Two rules then apply: skipping rc
    /// files drops an explicit rc file, and a one-shot command drops piped stdin.
    pub fn startup_capabilities(&self, desired: Capabilities) -> Capabilities {
        let supported = self.capabilities();
        let unsupported = Capabilities {
            rcfile: desired.rcfile && !supported.rcfile,
            norc: desired.norc && !supported.norc,
            stdin: desired.stdin && !supported.stdin,
            command: desired.command && !supported.command,
        };
        for option in unsupported.enabled() {
            log::warn!(
                "Shell '{}' does not support the '{}' startup option; ignoring it.",
                self.name(),
                option
            );
        }

        let mut granted = desired.intersect(supported);
        if granted.norc && granted.rcfile {
            log::debug!("'{}': norc overrules rcfile.", self.name());
            granted.rcfile = false;
        }
        if granted.command && granted.stdin {
            log::debug!("'{}': command overrules stdin.", self.name());
            granted.stdin = false;
        }
        granted
    }

    /// Finds the interpreter.
    ///
    /// A configured `executable_fullpath` wins, then `PATH`, then (when `check_syspaths`)
    /// the system path baseline. Returns `None` when nothing is found.
    pub fn locate_executable(&self, check_syspaths: bool) -> Option<PathBuf> {
        if let Some(path) = &self.executable_override {
            if path.is_file() {
                return Some(path.clone());
            }
            log::warn!(
                "Configured executable for '{}' does not exist: {}",
                self.name(),
                path.display()
            );
        }

        let exe = self.executable_name();
        let found = which::which(exe).ok().or_else(|| {
            if !check_syspaths {
                return None;
            }
            let syspaths = self.system_paths();
            let joined = env::join_paths(&syspaths).ok()?;
            let cwd = env::current_dir().unwrap_or_default();
            which::which_in(exe, Some(joined), cwd).ok()
        })?;

        if self.kind == ShellKind::GitBash
            && found.to_string_lossy().to_lowercase().contains("system32")
        {
            log::warn!(
                "'{}' resolved to {}, which looks like the WSL launcher rather than Git Bash. \
                 Set [shells.gitbash] executable_fullpath in rexsh.toml.",
                exe,
                found.display()
            );
        }
        log::debug!("Located '{}' at {}", self.name(), found.display());
        Some(dunce::simplified(&found).to_path_buf())
    }

    /// Like [`Shell::locate_executable`] with the system path fallback, but an error
    /// when nothing is found.
    pub fn executable_filepath(&self) -> Result<PathBuf, ShellError> {
        self.locate_executable(true)
            .ok_or_else(|| ShellError::ExecutableNotFound(self.name().to_string()))
    }

    /// True when the interpreter can be found.
    pub fn is_available(&self) -> bool {
        self.locate_executable(true).is_some()
    }

    /// The family's system path baseline, discovered once per process.
    pub fn system_paths(&self) -> Vec<String> {
        self.registry.system_paths(self)
    }

    /// The preferred reference form of `key`.
    pub fn key_token(&self, key: &str) -> String {
        self.backend.key_token(key)
    }

    /// Every reference form of `key`.
    pub fn all_key_tokens(&self, key: &str) -> Vec<String> {
        self.backend.all_key_tokens(key)
    }

    /// The family's path normalizer.
    pub fn normalizer(&self) -> &PathNormalizer {
        self.options.normalizer()
    }

    /// Converts a path into the family's grammar (identity when normalization is off).
    pub fn normalize_path(&self, path: &str) -> String {
        self.normalizer().normalize_path(path)
    }

    /// Converts a list value into the family's grammar (identity when normalization is off).
    pub fn normalize_paths(&self, value: &str) -> String {
        self.normalizer().normalize_paths(value)
    }

    /// The path as the host OS expects it.
    pub fn as_path(&self, path: &str) -> String {
        self.normalizer().as_path(path)
    }

    /// The path as the interpreter's own commands expect it.
    pub fn as_shell_path(&self, path: &str) -> String {
        self.normalizer().as_shell_path(path)
    }

    /// Compiles `actions` into a script for this family.
    pub fn compile(&self, actions: &ActionList) -> String {
        compiler::compile(&self.backend, actions, &self.options)
    }

    /// Quotes an argument vector into a single command line for this interpreter.
    pub fn join(&self, argv: &[String]) -> String {
        match self.kind {
            ShellKind::Cmd => argv
                .iter()
                .map(|arg| cmd::quote_arg(arg))
                .collect::<Vec<_>>()
                .join(" "),
            ShellKind::PowerShell | ShellKind::Pwsh => powershell::join(argv),
            _ => shlex::try_join(argv.iter().map(String::as_str)).unwrap_or_else(|_| {
                argv.iter()
                    .map(|arg| posix::quote_literal(arg))
                    .collect::<Vec<_>>()
                    .join(" ")
            }),
        }
    }

    /// The user rc files of this family that exist in the home directory.
    pub fn startup_files(&self) -> Vec<PathBuf> {
        let Some(home) = dirs::home_dir() else {
            return Vec::new();
        };
        self.kind
            .startup_files()
            .iter()
            .map(|name| home.join(name))
            .filter(|path| path.is_file())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::env_store::StaticStore;

    fn shell(kind: ShellKind) -> Shell {
        ShellRegistry::with_store(RexshConfig::default(), Box::new(StaticStore::default()))
            .shell_of(kind)
    }

    #[test]
    fn test_names_round_trip() {
        for kind in ShellKind::ALL {
            assert_eq!(kind.name().parse::<ShellKind>().unwrap(), kind);
        }
        assert!(matches!(
            "fish".parse::<ShellKind>(),
            Err(ShellError::UnknownShell(_))
        ));
    }

    #[test]
    fn test_capability_table() {
        assert_eq!(
            ShellKind::Sh.capabilities(),
            Capabilities::new(false, false, true, true)
        );
        assert_eq!(
            ShellKind::Zsh.capabilities(),
            Capabilities::new(false, true, true, true)
        );
        assert_eq!(
            ShellKind::Cmd.capabilities(),
            Capabilities::new(false, true, false, true)
        );
        // Stable across calls.
        assert_eq!(ShellKind::Bash.capabilities(), ShellKind::Bash.capabilities());
    }

    #[test]
    fn test_startup_negotiation() {
        let bash = shell(ShellKind::Bash);
        let granted = bash.startup_capabilities(Capabilities::new(true, true, true, true));
        assert_eq!(granted, Capabilities::new(false, true, false, true));

        let sh = shell(ShellKind::Sh);
        let granted = sh.startup_capabilities(Capabilities::new(true, true, true, false));
        assert_eq!(granted, Capabilities::new(false, false, true, false));
    }

    #[test]
    fn test_pathsep_and_extensions() {
        assert_eq!(ShellKind::GitBash.pathsep(), ":");
        assert_eq!(ShellKind::Cmd.pathsep(), ";");
        assert_eq!(ShellKind::PowerShell.file_extension(), "ps1");
        assert_eq!(ShellKind::Cmd.file_extension(), "bat");
        assert!(ShellKind::Sh.is_native());
    }

    #[test]
    fn test_gitbash_normalization() {
        let gitbash = shell(ShellKind::GitBash);
        assert_eq!(gitbash.normalize_path(r"C:\foo\bar\spam"), "/c/foo/bar/spam");
        assert_eq!(gitbash.as_shell_path(r"C:\foo\ctx.sh"), "C:/foo/ctx.sh");
        let bash = shell(ShellKind::Bash);
        assert_eq!(bash.normalize_path(r"C:\foo"), r"C:\foo");
    }

    #[test]
    fn test_disabled_normalization_from_config() {
        let config = RexshConfig {
            enable_path_normalization: false,
            ..RexshConfig::default()
        };
        let gitbash = ShellRegistry::with_store(config, Box::new(StaticStore::default()))
            .shell_of(ShellKind::GitBash);
        assert_eq!(gitbash.normalize_path(r"C:\foo\bar\spam"), r"C:\foo\bar\spam");
        assert_eq!(gitbash.normalize_paths(r"C:\foo:D:\bar"), r"C:\foo:D:\bar");
        assert_eq!(gitbash.as_path(r"C:\foo\bar\spam"), r"C:\foo\bar\spam");
        assert_eq!(gitbash.as_shell_path(r"C:\foo\bar\spam"), r"C:\foo\bar\spam");
    }

    #[test]
    fn test_join() {
        let argv = vec!["echo".to_string(), "a b".to_string(), "it's".to_string()];
        let line = shell(ShellKind::Bash).join(&argv);
        assert_eq!(shlex::split(&line).unwrap(), argv);
        assert_eq!(shell(ShellKind::Cmd).join(&argv), r#"echo "a b" it's"#);
        assert_eq!(shell(ShellKind::Pwsh).join(&argv), "echo 'a b' 'it''s'");
    }

    #[test]
    fn test_compile_chains_through_backend() {
        let mut actions = ActionList::new();
        actions.setenv("A", RexString::literal("x")).appendenv("A", "y");
        assert_eq!(
            shell(ShellKind::Sh).compile(&actions),
            "export A='x'\nexport A=\"${A}:\"\"y\"\n"
        );
    }
}
