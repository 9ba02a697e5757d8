// src/cli/handlers/exec.rs

use crate::{
    cli::handlers::commons::{self, ActionArgs},
    system::executor::LaunchRequest,
};
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::{
    io::{self, Read},
    path::PathBuf,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Runs a command, or an interactive session, in a shell with the given environment."
)]
struct ExecArgs {
    /// The shell family. Defaults to the configured or platform shell.
    #[arg(long, short)]
    shell: Option<String>,

    /// Skip the user's own startup files.
    #[arg(long)]
    norc: bool,

    /// Source this file before the environment actions.
    #[arg(long)]
    rcfile: Option<PathBuf>,

    /// Run this script instead of a command.
    #[arg(long, conflicts_with = "command")]
    script: Option<PathBuf>,

    /// Read the session's commands from standard input.
    #[arg(long)]
    stdin: bool,

    /// Working directory of the shell.
    #[arg(long)]
    cwd: Option<PathBuf>,

    #[command(flatten)]
    actions: ActionArgs,

    /// The command to run, after the options (or after `--`). A single argument is
    /// passed to the shell unchanged; several are quoted for it. Without a command an
    /// interactive session starts.
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

/// The main handler for the `exec` command. Returns the shell's exit code.
pub fn handle(args: Vec<String>) -> Result<i32> {
    let exec_args = ExecArgs::try_parse_from(&args)?;
    let shell = commons::resolve_shell(exec_args.shell.as_deref())?;

    let mut request = match (&exec_args.script, exec_args.command.as_slice()) {
        (Some(script), _) => LaunchRequest::script(script.clone()),
        (None, []) => LaunchRequest::interactive(),
        (None, [single]) => LaunchRequest::command(single.clone()),
        (None, argv) => LaunchRequest::command(shell.join(argv)),
    };
    request = request
        .norc(exec_args.norc)
        .stdin(exec_args.stdin)
        .actions(exec_args.actions.to_actions()?);
    if let Some(rcfile) = exec_args.rcfile {
        request = request.rcfile(rcfile);
    }
    if let Some(cwd) = exec_args.cwd {
        request = request.cwd(cwd);
    }

    let interactive = exec_args.script.is_none() && exec_args.command.is_empty();
    if interactive && !exec_args.stdin {
        println!(
            "\n--- {} '{}' {}. ---",
            "rexsh session in".green(),
            shell.name().yellow().bold(),
            "started".green()
        );
    }

    // The shell's stdin is a pipe in stdin mode, so forward ours through it.
    let input = if exec_args.stdin {
        let mut buffer = Vec::new();
        io::stdin()
            .read_to_end(&mut buffer)
            .context("Failed to read commands from stdin")?;
        Some(buffer)
    } else {
        None
    };

    let completed = request
        .assemble(&shell)
        .and_then(|launch| launch.spawn())
        .and_then(|process| process.communicate(input.as_deref()))
        .with_context(|| format!("Failed to run shell '{}'", shell.name()))?;
    let code = completed.exit_code.unwrap_or(1);
    if code != 0 {
        log::debug!("Shell '{}' exited with code {}", shell.name(), code);
    }
    Ok(code)
}
