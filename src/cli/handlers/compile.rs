// src/cli/handlers/compile.rs

use crate::{
    cli::handlers::commons::{self, ActionArgs},
    core::rex::ActionList,
};
use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Prints the script a shell family would run for a set of environment actions."
)]
struct CompileArgs {
    /// The shell family. Defaults to the configured or platform shell.
    #[arg(long, short)]
    shell: Option<String>,

    /// Start the script with the family's header line.
    #[arg(long)]
    shebang: bool,

    #[command(flatten)]
    actions: ActionArgs,
}

/// The main handler for the `compile` command.
pub fn handle(args: Vec<String>) -> Result<i32> {
    let compile_args = CompileArgs::try_parse_from(&args)?;
    let shell = commons::resolve_shell(compile_args.shell.as_deref())?;

    let mut actions = ActionList::new();
    if compile_args.shebang {
        actions.shebang();
    }
    actions.extend(compile_args.actions.to_actions()?);

    print!("{}", shell.compile(&actions));
    Ok(0)
}
