//! `rexsh` hands a resolved environment to a command interpreter.
//!
//! Environment changes are described once as a [`core::rex::ActionList`] and compiled into
//! the native syntax of a shell family ([`shells::ShellKind`]): POSIX shells, `cmd.exe`, or
//! PowerShell. The [`system`] layer discovers system paths and launches the shells.

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod shells;
pub mod system;
