//! CLI argument definitions using clap
//!
//! Commands:
//! - datalake serve --config <path> [--root <dir>] [--port <port>]
//! - datalake query --principal <name> --config <path> [--root <dir>]

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Datalake - a permissioned query layer over JSON, JSON-Lines and CSV files
#[derive(Parser, Debug)]
#[command(name = "datalake")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to configuration file
    #[arg(long, env = "DATALAKE_CONFIG", default_value = "./datalake.json")]
    pub config: PathBuf,

    /// Sandbox root; overrides `root` in the configuration file
    #[arg(long, env = "DATALAKE_ROOT")]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        #[command(flatten)]
        common: CommonArgs,

        /// Port to listen on; overrides `http.port`
        #[arg(long)]
        port: Option<u16>,
    },

    /// Execute a single query read from stdin and exit
    Query {
        #[command(flatten)]
        common: CommonArgs,

        /// Principal the query runs as
        #[arg(long)]
        principal: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let cli = Cli::try_parse_from([
            "datalake",
            "query",
            "--principal",
            "alice",
            "--config",
            "/etc/datalake.json",
        ])
        .unwrap();

        match cli.command {
            Command::Query { common, principal } => {
                assert_eq!(principal, "alice");
                assert_eq!(common.config, PathBuf::from("/etc/datalake.json"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_with_root() {
        let cli =
            Cli::try_parse_from(["datalake", "serve", "--root", "/srv/lake", "--port", "9000"])
                .unwrap();

        match cli.command {
            Command::Serve { common, port } => {
                assert_eq!(common.root, Some(PathBuf::from("/srv/lake")));
                assert_eq!(port, Some(9000));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_query_requires_principal() {
        assert!(Cli::try_parse_from(["datalake", "query"]).is_err());
    }
}
