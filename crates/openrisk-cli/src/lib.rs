//! # openrisk-cli
//!
//! Argument parsing and command dispatch for the `openrisk` binary.

pub mod cli;
pub mod commands;
pub mod reports;

pub use cli::{Cli, Command};
pub use commands::execute;
