//! # System Interaction Layer
//!
//! Everything that touches the machine the shells run on.
//!
//! ## Modules
//!
//! - **`env_store`**: Read access to the persistent Machine and User environment. Backed by
//!   the Windows registry on Windows and empty elsewhere.
//! - **`syspaths`**: Discovers the baseline `PATH` of a shell family by spawning it with an
//!   empty `PATH` and merging the persistent store's entries.
//! - **`registry`**: The process-wide shell registry. Creates configured [`crate::shells::Shell`]
//!   instances and caches their system paths.
//! - **`executor`**: Assembles the context script and argument vector for a launch, spawns
//!   the shell, and collects its exit status and output.

pub mod env_store;
pub mod executor;
pub mod registry;
pub mod syspaths;
