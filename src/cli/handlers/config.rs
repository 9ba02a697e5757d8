// src/cli/handlers/config.rs

use crate::{core::config_loader, models::RexshConfig};
use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Shows the effective configuration or writes a default rexsh.toml."
)]
struct ConfigArgs {
    /// Write a default configuration file.
    #[arg(long)]
    init: bool,

    /// Overwrite an existing file when used with --init.
    #[arg(long, requires = "init")]
    force: bool,

    /// Only print the location of the configuration file.
    #[arg(long)]
    path: bool,
}

/// The main handler for the `config` command.
pub fn handle(args: Vec<String>) -> Result<i32> {
    let config_args = ConfigArgs::try_parse_from(&args)?;
    let path = config_loader::config_path()?;

    if config_args.path {
        println!("{}", path.display());
        return Ok(0);
    }

    if config_args.init {
        if path.exists() && !config_args.force {
            return Err(anyhow!(
                "'{}' already exists. Use --force to overwrite it.",
                path.display()
            ));
        }
        config_loader::save_config(&RexshConfig::default(), &path)?;
        println!(
            "{} {}",
            "Configuration written to".green(),
            path.display().to_string().yellow()
        );
        return Ok(0);
    }

    let config = config_loader::load_config_from(&path)?;
    let source = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, defaults)", path.display())
    };
    println!("# {}", source.dimmed());
    print!("{}", config_loader::render_config(&config)?);
    Ok(0)
}
