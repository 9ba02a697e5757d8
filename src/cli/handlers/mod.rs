// src/cli/handlers/mod.rs

// One module per `rexsh` command.

pub mod commons;
pub mod compile;
pub mod config;
pub mod exec;
pub mod shells;
pub mod syspaths;
