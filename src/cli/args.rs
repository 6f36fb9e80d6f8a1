//! CLI argument definitions using clap
//!
//! Commands:
//! - tenantql start --config <path>
//! - tenantql explain --config <path> --tenant <sid>
//! - tenantql check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tenantql - multi-tenant document queries over a single JSONB table
#[derive(Parser, Debug)]
#[command(name = "tenantql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP query service
    Start {
        /// Path to configuration file
        #[arg(long, default_value = "./tenantql.json")]
        config: PathBuf,
    },

    /// Read a query request from stdin and print the statements it plans
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./tenantql.json")]
        config: PathBuf,

        /// Tenant the query is scoped to
        #[arg(long)]
        tenant: String,
    },

    /// Load and validate a configuration file
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./tenantql.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
