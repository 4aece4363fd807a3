//! CLI module
//!
//! Command-line interface for calling a service described in YAML.
//!
//! # Commands
//!
//! - `request` - Issue one or more paced requests and print the payloads
//! - `validate` - Check a service definition and build its client

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
