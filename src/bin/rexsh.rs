// src/bin/rexsh.rs

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser};
use colored::*;
use rexsh::cli::{Cli, handlers};

// --- Command Definition and Registry ---

/// A system command, its aliases, and its handler. Handlers return the process exit code.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>) -> Result<i32>,
}

/// Every command `rexsh` understands.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "compile",
        aliases: &["c"],
        handler: handlers::compile::handle,
    },
    CommandDefinition {
        name: "config",
        aliases: &[],
        handler: handlers::config::handle,
    },
    CommandDefinition {
        name: "exec",
        aliases: &["x", "run"],
        handler: handlers::exec::handle,
    },
    CommandDefinition {
        name: "shells",
        aliases: &["ls"],
        handler: handlers::shells::handle,
    },
    CommandDefinition {
        name: "syspaths",
        aliases: &[],
        handler: handlers::syspaths::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Sets up logging, dispatches to a handler and turns its result into the exit status.
fn main() {
    env_logger::init();

    match run_cli(Cli::parse()) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            // Argument errors from the handlers' own parsers print their usage text.
            if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
                clap_err.exit();
            }
            eprintln!("\n{}: {:#}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run_cli(cli: Cli) -> Result<i32> {
    log::debug!("CLI args parsed: {:?}", cli);

    let Some(command_name) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(0);
    };

    let command = find_command(&command_name).ok_or_else(|| {
        let known: Vec<&str> = COMMAND_REGISTRY.iter().map(|cmd| cmd.name).collect();
        anyhow!(
            "Unknown command '{}'. Available commands: {}",
            command_name,
            known.join(", ")
        )
    })?;
    (command.handler)(cli.args)
}
