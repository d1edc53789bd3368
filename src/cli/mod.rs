//! CLI module for datalake
//!
//! Provides command-line interface for:
//! - serve: Run the HTTP server
//! - query: One-shot query execution (JSON on stdin, JSON on stdout)

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, CommonArgs};
pub use commands::{load_config, query, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};
