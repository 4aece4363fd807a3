//! CLI commands and argument parsing

use crate::types::Method;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Rate-limited client for SaaS REST APIs
#[derive(Parser, Debug)]
#[command(name = "paced-client")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Service definition file (YAML)
    #[arg(short, long, global = true)]
    pub service: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Issue a request against the service
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: Method,

        /// Path relative to the service base URL
        path: String,

        /// Query parameter as key=value (repeat a key to send a list)
        #[arg(short, long = "query")]
        query: Vec<String>,

        /// JSON body
        #[arg(short, long)]
        data: Option<String>,

        /// Extra header as Name:value
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Number of times to send the request (paced)
        #[arg(long, default_value = "1")]
        repeat: u32,

        /// Overall deadline per request, in seconds
        #[arg(long)]
        deadline_secs: Option<f64>,
    },

    /// Validate the service definition
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
