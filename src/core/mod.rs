// src/core/mod.rs

pub mod compiler;
pub mod config_loader;
pub mod paths;
pub mod rex;
