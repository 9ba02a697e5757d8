// src/cli/handlers/commons.rs

//! Helpers shared by the command handlers.

use crate::{
    core::rex::{ActionList, RexString},
    shells::Shell,
    system::registry::ShellRegistry,
};
use anyhow::{Context, Result, anyhow};
use clap::Args;

/// Environment actions accepted by `compile` and `exec`, applied in this order:
/// unsets, sets, prepends, appends, aliases.
#[derive(Args, Debug, Default, Clone)]
pub struct ActionArgs {
    /// Assign a variable (`KEY=VALUE`). Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Add an entry at the end of a list variable (`KEY=VALUE`). Repeatable.
    #[arg(long = "append", value_name = "KEY=VALUE")]
    pub append: Vec<String>,

    /// Add an entry at the front of a list variable (`KEY=VALUE`). Repeatable.
    #[arg(long = "prepend", value_name = "KEY=VALUE")]
    pub prepend: Vec<String>,

    /// Remove a variable. Repeatable.
    #[arg(long = "unset", value_name = "KEY")]
    pub unset: Vec<String>,

    /// Define an alias (`NAME=COMMAND`). Repeatable.
    #[arg(long = "alias", value_name = "NAME=COMMAND")]
    pub alias: Vec<String>,

    /// Treat every value as literal text instead of allowing variable references.
    #[arg(long)]
    pub literal: bool,
}

impl ActionArgs {
    /// Builds the action list described by the arguments.
    pub fn to_actions(&self) -> Result<ActionList> {
        let value = |text: String| {
            if self.literal {
                RexString::literal(text)
            } else {
                RexString::expandable(text)
            }
        };

        let mut actions = ActionList::new();
        for key in &self.unset {
            actions.unsetenv(key.as_str());
        }
        for assignment in &self.set {
            let (key, v) = parse_assignment(assignment)?;
            actions.setenv(key, value(v));
        }
        for assignment in &self.prepend {
            let (key, v) = parse_assignment(assignment)?;
            actions.prependenv(key, value(v));
        }
        for assignment in &self.append {
            let (key, v) = parse_assignment(assignment)?;
            actions.appendenv(key, value(v));
        }
        for assignment in &self.alias {
            let (name, command) = parse_assignment(assignment)?;
            actions.alias(name, command);
        }
        Ok(actions)
    }
}

/// Splits `KEY=VALUE` at the first `=`. The key must not be empty.
pub fn parse_assignment(text: &str) -> Result<(String, String)> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{}'.", text))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("Empty key in '{}'.", text));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Builds the shell named `name` (or the default one) from the global registry.
pub fn resolve_shell(name: Option<&str>) -> Result<Shell> {
    ShellRegistry::global()
        .create_shell(name)
        .with_context(|| format!("Failed to select shell '{}'", name.unwrap_or("<default>")))
}
