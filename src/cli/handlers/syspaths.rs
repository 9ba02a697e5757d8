// src/cli/handlers/syspaths.rs

use crate::cli::handlers::commons;
use anyhow::Result;
use clap::Parser;
use colored::*;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Prints the system path baseline of a shell family."
)]
struct SyspathsArgs {
    /// The shell family. Defaults to the configured or platform shell.
    #[arg(long, short)]
    shell: Option<String>,

    /// Print JSON instead of one path per line.
    #[arg(long)]
    json: bool,
}

/// The main handler for the `syspaths` command.
pub fn handle(args: Vec<String>) -> Result<i32> {
    let syspaths_args = SyspathsArgs::try_parse_from(&args)?;
    let shell = commons::resolve_shell(syspaths_args.shell.as_deref())?;
    let paths = shell.system_paths();

    if syspaths_args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(0);
    }

    println!(
        "\n--- {} '{}' ---",
        "System paths for".green(),
        shell.name().yellow().bold()
    );
    if paths.is_empty() {
        println!("  {}", "(none discovered)".dimmed());
    }
    for path in &paths {
        println!("  {}", path);
    }
    Ok(0)
}
