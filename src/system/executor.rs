// src/system/executor.rs

//! # Launcher
//!
//! Starts an interpreter with a compiled context script, in three typed steps:
//!
//! 1. [`LaunchRequest::assemble`] validates the request against the family's
//!    capabilities, writes the context script to a scratch directory and builds the
//!    argument vector ([`AssembledLaunch`]).
//! 2. [`AssembledLaunch::spawn`] starts the process ([`ShellProcess`]).
//! 3. [`ShellProcess::wait`] or [`ShellProcess::communicate`] collects the exit code and
//!    captured streams ([`CompletedProcess`]).
//!
//! The scratch directory lives as long as the [`ShellProcess`] handle.

use crate::{
    constants::{CONTEXT_SCRIPT_STEM, SCRATCH_DIR_PREFIX},
    core::rex::{ActionList, RexString},
    core::compiler::Dialect,
    shells::{Shell, ShellError, ShellKind, posix},
};
use std::{
    collections::HashMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    thread,
};
use tempfile::TempDir;
use thiserror::Error;

/// Errors raised while assembling, starting or waiting for a shell.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The request needs a startup option the family does not have.
    #[error("Shell '{shell}' does not support {feature}.")]
    Unsupported {
        /// The family name.
        shell: String,
        /// What was asked for.
        feature: &'static str,
    },
    /// The interpreter could not be found.
    #[error(transparent)]
    Shell(#[from] ShellError),
    /// The scratch directory or context script could not be written.
    #[error("Failed to prepare the context script: {0}")]
    Scratch(#[source] io::Error),
    /// The process could not be started.
    #[error("Could not start '{program}': {source}")]
    Spawn {
        /// The interpreter path.
        program: String,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// Waiting for the process or exchanging data with it failed.
    #[error("Failed while communicating with '{shell}': {source}")]
    Wait {
        /// The family name.
        shell: String,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// The process ended unsuccessfully.
    #[error("Shell '{shell}' exited with code {}.", .code.map_or("<signal>".to_string(), |c| c.to_string()))]
    NonZeroExit {
        /// The family name.
        shell: String,
        /// The exit code, `None` when the process was killed by a signal.
        code: Option<i32>,
    },
}

/// What the interpreter should do once the context is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// Run one command line, written in the interpreter's own syntax, and exit.
    Command(String),
    /// Run a script file and exit.
    Script(PathBuf),
    /// Stay open for the user (or for commands piped on stdin).
    Interactive,
}

/// How a standard output stream of the child is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stream {
    /// Shares the parent's stream.
    #[default]
    Inherit,
    /// Captured into the [`CompletedProcess`].
    Piped,
    /// Discarded.
    Null,
}

impl Stream {
    fn to_stdio(self) -> Stdio {
        match self {
            Stream::Inherit => Stdio::inherit(),
            Stream::Piped => Stdio::piped(),
            Stream::Null => Stdio::null(),
        }
    }
}

/// Everything needed to start a shell.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    mode: LaunchMode,
    norc: bool,
    rcfile: Option<PathBuf>,
    stdin: bool,
    stdout: Stream,
    stderr: Stream,
    env: Option<HashMap<String, String>>,
    cwd: Option<PathBuf>,
    actions: ActionList,
}

impl LaunchRequest {
    fn with_mode(mode: LaunchMode) -> Self {
        Self {
            mode,
            norc: false,
            rcfile: None,
            stdin: false,
            stdout: Stream::Inherit,
            stderr: Stream::Inherit,
            env: None,
            cwd: None,
            actions: ActionList::new(),
        }
    }

    /// Runs `command` and exits.
    pub fn command(command: impl Into<String>) -> Self {
        Self::with_mode(LaunchMode::Command(command.into()))
    }

    /// Runs the script at `path` and exits.
    pub fn script(path: impl Into<PathBuf>) -> Self {
        Self::with_mode(LaunchMode::Script(path.into()))
    }

    /// Opens an interactive session.
    pub fn interactive() -> Self {
        Self::with_mode(LaunchMode::Interactive)
    }

    /// Skips the user's own startup files.
    pub fn norc(mut self, norc: bool) -> Self {
        self.norc = norc;
        self
    }

    /// Sources `path` after the user's startup files and before the actions.
    pub fn rcfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.rcfile = Some(path.into());
        self
    }

    /// Pipes the child's standard input. In interactive mode the interpreter then reads
    /// its commands from it.
    pub fn stdin(mut self, stdin: bool) -> Self {
        self.stdin = stdin;
        self
    }

    /// Wiring of the child's standard output.
    pub fn stdout(mut self, stream: Stream) -> Self {
        self.stdout = stream;
        self
    }

    /// Wiring of the child's standard error.
    pub fn stderr(mut self, stream: Stream) -> Self {
        self.stderr = stream;
        self
    }

    /// Replaces the inherited environment with `env`.
    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Working directory of the child.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// The environment actions forming the context.
    pub fn actions(mut self, actions: ActionList) -> Self {
        self.actions = actions;
        self
    }

    /// The requested mode.
    pub fn mode(&self) -> &LaunchMode {
        &self.mode
    }

    fn validate(&self, shell: &Shell) -> Result<(), LaunchError> {
        let caps = shell.capabilities();
        let unsupported = |feature| LaunchError::Unsupported {
            shell: shell.name().to_string(),
            feature,
        };
        match self.mode {
            LaunchMode::Command(_) if !caps.command => return Err(unsupported("one-shot commands")),
            LaunchMode::Script(_) if !caps.command => return Err(unsupported("running scripts")),
            LaunchMode::Interactive if self.stdin && !caps.stdin => {
                return Err(unsupported("reading commands from piped stdin"));
            }
            _ => {}
        }
        if self.rcfile.is_some() && !caps.rcfile {
            return Err(unsupported("an explicit rc file"));
        }
        if self.norc && !caps.norc {
            return Err(unsupported("skipping rc files"));
        }
        Ok(())
    }

    /// Validates the request, writes the context script and builds the argument vector.
    pub fn assemble(self, shell: &Shell) -> Result<AssembledLaunch, LaunchError> {
        self.validate(shell)?;
        let program = shell.executable_filepath()?;

        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_DIR_PREFIX)
            .tempdir()
            .map_err(LaunchError::Scratch)?;
        let context_path = scratch
            .path()
            .join(format!("{}.{}", CONTEXT_SCRIPT_STEM, shell.file_extension()));
        let context_path = dunce::simplified(&context_path).to_path_buf();

        let script = shell.compile(&self.context_actions(shell));
        fs::write(&context_path, &script).map_err(LaunchError::Scratch)?;
        log::debug!(
            "Context script for '{}' written to {}:\n{}",
            shell.name(),
            context_path.display(),
            script
        );

        let mut launch = AssembledLaunch {
            shell: shell.name().to_string(),
            program,
            args: Vec::new(),
            raw_last_arg: false,
            env_overrides: Vec::new(),
            env_removals: Vec::new(),
            base_env: self.env.clone(),
            cwd: self.cwd.clone(),
            stdin: self.stdin,
            stdout: self.stdout,
            stderr: self.stderr,
            context_path,
            scratch,
        };
        if self.norc {
            launch.env_removals = vec!["BASH_ENV".to_string(), "ENV".to_string()];
        }

        match shell.kind() {
            ShellKind::Cmd => self.build_cmd_args(shell, &mut launch),
            ShellKind::PowerShell | ShellKind::Pwsh => self.build_powershell_args(shell, &mut launch),
            _ => self.build_posix_args(shell, &mut launch).map_err(LaunchError::Scratch)?,
        }
        log::debug!("Launching {} {:?}", launch.program.display(), launch.args);
        Ok(launch)
    }

    /// Assembles, spawns and waits.
    pub fn run(self, shell: &Shell) -> Result<CompletedProcess, LaunchError> {
        self.assemble(shell)?.spawn()?.wait()
    }

    /// User rc files (unless skipped), the explicit rc file, then the caller's actions.
    fn context_actions(&self, shell: &Shell) -> ActionList {
        let mut context = ActionList::new();
        context.shebang();
        if !self.norc {
            for file in shell.startup_files() {
                context.source(RexString::literal(
                    shell.as_shell_path(&file.to_string_lossy()),
                ));
            }
        }
        if let Some(rcfile) = &self.rcfile {
            context.source(RexString::literal(shell.as_shell_path(&rcfile.to_string_lossy())));
        }
        context.extend(self.actions.clone());
        context
    }

    /// The one-shot command line to run after the context, in the interpreter's syntax.
    fn command_text(&self, shell: &Shell) -> Option<String> {
        match &self.mode {
            LaunchMode::Command(command) => Some(command.clone()),
            LaunchMode::Script(path) => Some(shell.backend().source(&RexString::literal(
                shell.as_shell_path(&path.to_string_lossy()),
            ))),
            LaunchMode::Interactive => None,
        }
    }

    fn build_posix_args(&self, shell: &Shell, launch: &mut AssembledLaunch) -> io::Result<()> {
        let kind = shell.kind();
        let context = posix::quote_literal(&shell.as_shell_path(&launch.context_path.to_string_lossy()));
        let norc_flag = kind.norc_flag().filter(|_| self.norc);

        if let Some(command) = self.command_text(shell) {
            launch.args.extend(norc_flag.map(str::to_string));
            launch.args.push("-c".to_string());
            launch.args.push(format!(". {}\n{}", context, command));
            return Ok(());
        }

        // The piped commands run in the same process as the context so its functions
        // (aliases) stay defined.
        if self.stdin {
            launch.args.extend(norc_flag.map(str::to_string));
            launch.args.push("-c".to_string());
            launch.args.push(format!(". {}\n. /dev/stdin", context));
            return Ok(());
        }

        let context_arg = shell.as_shell_path(&launch.context_path.to_string_lossy());
        match kind {
            ShellKind::Bash | ShellKind::GitBash => {
                launch.args.extend(["--rcfile".to_string(), context_arg, "-i".to_string()]);
            }
            ShellKind::Zsh => {
                let zdotdir = launch.scratch.path().to_path_buf();
                fs::write(zdotdir.join(".zshrc"), format!(". {}\n", context))?;
                launch.env_overrides.push((
                    "ZDOTDIR".to_string(),
                    dunce::simplified(&zdotdir).to_string_lossy().into_owned(),
                ));
                launch.args.push("-i".to_string());
            }
            _ => {
                launch.env_overrides.push(("ENV".to_string(), context_arg));
                launch.args.push("-i".to_string());
            }
        }
        Ok(())
    }

    fn build_cmd_args(&self, shell: &Shell, launch: &mut AssembledLaunch) {
        let call = format!("call \"{}\"", shell.as_shell_path(&launch.context_path.to_string_lossy()));
        if self.norc {
            launch.args.push("/D".to_string());
        }
        launch.args.push("/Q".to_string());
        match self.command_text(shell) {
            Some(command) => {
                let aliases = self.actions.aliases();
                launch.args.push("/C".to_string());
                launch
                    .args
                    .push(format!("{} & {}", call, expand_leading_alias(&command, &aliases)));
            }
            None => {
                launch.args.push("/K".to_string());
                launch.args.push(call);
            }
        }
        launch.raw_last_arg = true;
    }

    fn build_powershell_args(&self, shell: &Shell, launch: &mut AssembledLaunch) {
        let context = format!(
            "'{}'",
            shell
                .as_shell_path(&launch.context_path.to_string_lossy())
                .replace('\'', "''")
        );
        launch.args.push("-NoLogo".to_string());
        if self.norc {
            launch.args.push("-NoProfile".to_string());
        }
        if cfg!(windows) {
            launch
                .args
                .extend(["-ExecutionPolicy".to_string(), "Bypass".to_string()]);
        }
        match self.command_text(shell) {
            Some(command) => {
                launch.args.push("-Command".to_string());
                launch
                    .args
                    .push(format!(". {}; {}; exit $LASTEXITCODE", context, command));
            }
            None => {
                launch.args.push("-NoExit".to_string());
                launch.args.push("-Command".to_string());
                launch.args.push(format!(". {}", context));
            }
        }
    }
}

/// Replaces the first word of `command` with the alias body when it names an alias.
pub fn expand_leading_alias(command: &str, aliases: &HashMap<&str, &str>) -> String {
    let trimmed = command.trim_start();
    let (word, rest) = match trimmed.find(char::is_whitespace) {
        Some(end) => trimmed.split_at(end),
        None => (trimmed, ""),
    };
    match aliases.get(word) {
        Some(body) => format!("{}{}", body, rest),
        None => command.to_string(),
    }
}

/// A validated launch whose context script is on disk.
#[derive(Debug)]
pub struct AssembledLaunch {
    shell: String,
    program: PathBuf,
    args: Vec<String>,
    raw_last_arg: bool,
    env_overrides: Vec<(String, String)>,
    env_removals: Vec<String>,
    base_env: Option<HashMap<String, String>>,
    cwd: Option<PathBuf>,
    stdin: bool,
    stdout: Stream,
    stderr: Stream,
    context_path: PathBuf,
    scratch: TempDir,
}

impl AssembledLaunch {
    /// The interpreter that will be started.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The arguments passed after the program.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Where the context script was written.
    pub fn context_path(&self) -> &Path {
        &self.context_path
    }

    /// Variables set on top of the child's environment.
    pub fn env_overrides(&self) -> &[(String, String)] {
        &self.env_overrides
    }

    /// Starts the process.
    pub fn spawn(self) -> Result<ShellProcess, LaunchError> {
        let mut command = Command::new(&self.program);
        if let Some(env) = &self.base_env {
            command.env_clear().envs(env);
        }
        for key in &self.env_removals {
            command.env_remove(key);
        }
        command.envs(self.env_overrides.iter().map(|(k, v)| (k, v)));
        if let Some(cwd) = &self.cwd {
            command.current_dir(dunce::simplified(cwd));
        }
        self.push_args(&mut command);
        command
            .stdin(if self.stdin { Stdio::piped() } else { Stdio::inherit() })
            .stdout(self.stdout.to_stdio())
            .stderr(self.stderr.to_stdio());

        let child = command.spawn().map_err(|source| LaunchError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;
        log::debug!("Started '{}' (PID: {})", self.shell, child.id());
        Ok(ShellProcess {
            shell: self.shell,
            child,
            _scratch: self.scratch,
        })
    }

    #[cfg(windows)]
    fn push_args(&self, command: &mut Command) {
        use std::os::windows::process::CommandExt;
        match self.args.split_last() {
            Some((last, head)) if self.raw_last_arg => {
                command.args(head);
                command.raw_arg(last);
            }
            _ => {
                command.args(&self.args);
            }
        }
    }

    #[cfg(not(windows))]
    fn push_args(&self, command: &mut Command) {
        command.args(&self.args);
    }
}

/// A running shell.
#[derive(Debug)]
pub struct ShellProcess {
    shell: String,
    child: Child,
    _scratch: TempDir,
}

impl ShellProcess {
    /// The OS process id.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// The live child, for callers that need direct access to its pipes.
    pub fn child_mut(&mut self) -> &mut Child {
        &mut self.child
    }

    /// Kills the process.
    pub fn kill(&mut self) -> Result<(), LaunchError> {
        self.child.kill().map_err(|source| self.wait_error(source))
    }

    /// The exit code if the process has already ended.
    pub fn exit_code(&mut self) -> Result<Option<i32>, LaunchError> {
        match self.child.try_wait() {
            Ok(status) => Ok(status.and_then(|s| s.code())),
            Err(source) => Err(self.wait_error(source)),
        }
    }

    /// Waits for the process, collecting any piped output.
    pub fn wait(self) -> Result<CompletedProcess, LaunchError> {
        self.communicate(None)
    }

    /// Writes `input` to the piped stdin (then closes it) and waits for the process.
    pub fn communicate(mut self, input: Option<&[u8]>) -> Result<CompletedProcess, LaunchError> {
        let writer = match (self.child.stdin.take(), input) {
            (Some(mut stdin), Some(input)) => {
                let input = input.to_vec();
                Some(thread::spawn(move || stdin.write_all(&input)))
            }
            _ => None,
        };

        let output = match self.child.wait_with_output() {
            Ok(output) => output,
            Err(source) => {
                return Err(LaunchError::Wait {
                    shell: self.shell,
                    source,
                });
            }
        };
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Err(e)) if e.kind() != io::ErrorKind::BrokenPipe => {
                    log::warn!("Failed to write stdin of '{}': {}", self.shell, e);
                }
                Err(_) => log::warn!("Stdin writer for '{}' panicked.", self.shell),
                _ => {}
            }
        }

        let completed = CompletedProcess {
            shell: self.shell,
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        log::debug!(
            "'{}' finished with exit code {:?}",
            completed.shell,
            completed.exit_code
        );
        Ok(completed)
    }

    fn wait_error(&self, source: io::Error) -> LaunchError {
        LaunchError::Wait {
            shell: self.shell.clone(),
            source,
        }
    }
}

/// A finished shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedProcess {
    /// The family name.
    pub shell: String,
    /// The exit code, `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output (empty unless piped).
    pub stdout: String,
    /// Captured standard error (empty unless piped).
    pub stderr: String,
}

impl CompletedProcess {
    /// True when the process exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turns an unsuccessful exit into [`LaunchError::NonZeroExit`].
    pub fn check(self) -> Result<Self, LaunchError> {
        if self.success() {
            Ok(self)
        } else {
            Err(LaunchError::NonZeroExit {
                shell: self.shell,
                code: self.exit_code,
            })
        }
    }
}
