//! CLI module for tenantql
//!
//! Provides command-line interface for:
//! - start: serve the HTTP query API
//! - explain: print the statements a query request plans to
//! - check-config: validate a configuration file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_config, explain, run, run_command, start};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_json};
