// src/cli/handlers/shells.rs

use crate::{models::Capabilities, shells::ShellKind, system::registry::ShellRegistry};
use anyhow::Result;
use clap::Parser;
use colored::*;
use rayon::prelude::*;
use serde::Serialize;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Lists shell families, their availability and capabilities."
)]
struct ShellsArgs {
    /// Include families that cannot run on this platform.
    #[arg(long)]
    all: bool,

    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

/// One row of the report.
#[derive(Serialize, Debug)]
struct ShellReport {
    name: &'static str,
    executable: Option<String>,
    pathsep: &'static str,
    extension: &'static str,
    capabilities: Capabilities,
}

/// The main handler for the `shells` command.
pub fn handle(args: Vec<String>) -> Result<i32> {
    let shells_args = ShellsArgs::try_parse_from(&args)?;
    let registry = ShellRegistry::global();
    let kinds: Vec<ShellKind> = if shells_args.all {
        ShellKind::ALL.to_vec()
    } else {
        registry.shell_types()
    };

    // Locating an executable may spawn the interpreter for its system paths, so probe
    // every family at once.
    let reports: Vec<ShellReport> = kinds
        .par_iter()
        .map(|kind| {
            let shell = registry.shell_of(*kind);
            ShellReport {
                name: shell.name(),
                executable: shell
                    .locate_executable(true)
                    .map(|path| path.display().to_string()),
                pathsep: shell.pathsep(),
                extension: shell.file_extension(),
                capabilities: shell.capabilities(),
            }
        })
        .collect();

    if shells_args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(0);
    }

    println!("\n--- {} ---", "Shells".yellow().bold());
    for report in &reports {
        let status = match &report.executable {
            Some(path) => path.green().to_string(),
            None => "not found".red().to_string(),
        };
        println!(
            "  {:<12} {}\n  {:<12} sep '{}', .{}, {}",
            report.name.cyan().bold(),
            status,
            "",
            report.pathsep,
            report.extension,
            report.capabilities.enabled().join(", ").dimmed()
        );
    }
    Ok(0)
}
