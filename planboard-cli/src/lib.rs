//! Planboard CLI library.
//!
//! Exposes the CLI definition and subcommand implementations so the binary
//! stays a thin dispatcher and the commands can be tested directly.

pub mod cli;
pub mod commands;
pub mod config;
pub mod render;
pub mod snapshot_file;

pub use cli::{Cli, Commands};
pub use config::{ConfigError, ConfigLoader};
