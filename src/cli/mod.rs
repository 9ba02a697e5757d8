// src/cli/mod.rs

use clap::Parser;

pub mod handlers;

/// rexsh: hand a resolved environment to any command interpreter.
///
/// Commands:
///
/// - `rexsh shells [--all] [--json]`       list shell families and their capabilities
/// - `rexsh syspaths [--shell S] [--json]` print a family's system path baseline
/// - `rexsh compile [--shell S] ...`      print the script for a set of environment actions
/// - `rexsh exec [--shell S] ... [-- CMD]` run a command (or a session) in that environment
/// - `rexsh config [--init] [--path]`      show or create `rexsh.toml`
///
/// Environment actions: `--set K=V`, `--append K=V`, `--prepend K=V`, `--unset K`,
/// `--alias NAME=COMMAND`, `--literal` (treat every value as literal text).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// The command to run.
    pub command: Option<String>,

    /// Arguments for the command.
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}
