//! CLI command implementations

use std::sync::Arc;

use crate::access::Principal;
use crate::config::Config;
use crate::http_server::{DataState, HttpServer};
use crate::observability::{init_logging, log_event_with_fields, Event};
use crate::query::{QueryRequest, QueryService};

use super::args::{Command, CommonArgs};
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { common, port } => serve(&common, port),
        Command::Query { common, principal } => query(&common, &principal),
    }
}

/// Load the configuration file and apply command-line overrides.
///
/// A missing file is tolerated when `--root` is given; every section then
/// takes its defaults.
pub fn load_config(args: &CommonArgs) -> CliResult<Config> {
    let config = match (&args.root, args.config.exists()) {
        (Some(root), false) => Config::default().with_root(root),
        (Some(root), true) => Config::load(&args.config)?.with_root(root),
        (None, _) => Config::load(&args.config)?,
    };

    config.validate()?;
    Ok(config)
}

/// Install logging for `config` and record which configuration is in effect
fn init_observability(args: &CommonArgs, config: &Config) {
    init_logging(&config.log);

    let path = args.config.display().to_string();
    let root = config.root.display().to_string();
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("config", path.as_str()), ("root", root.as_str())],
    );
}

fn build_service(config: &Config) -> CliResult<QueryService> {
    Ok(config.build_service()?)
}

/// Start the HTTP server and block until shutdown
pub fn serve(args: &CommonArgs, port: Option<u16>) -> CliResult<()> {
    let mut config = load_config(args)?;
    init_observability(args, &config);

    if let Some(port) = port {
        config.http.port = port;
    }

    let service = build_service(&config)?;
    let state = Arc::new(DataState::new(service, config.access.clone()));
    let server = HttpServer::with_config(config.http.clone(), state);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::serve_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::serve_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Run one JSON request from stdin and write the outcome to stdout.
///
/// Query failures are reported in the response envelope and still make the
/// command fail.
pub fn query(args: &CommonArgs, principal: &str) -> CliResult<()> {
    let config = load_config(args)?;
    init_observability(args, &config);

    let service = build_service(&config)?;
    let request = read_request()?;
    let principal = Principal::named(principal);

    match run_query(&service, &principal, &request) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.kind().as_str(), &e.public_message())?;
            Err(CliError::query_failed(e.public_message()))
        }
    }
}

fn run_query(
    service: &QueryService,
    principal: &Principal,
    request: &serde_json::Value,
) -> crate::query::QueryResult<serde_json::Value> {
    let request = QueryRequest::from_json(request)?;
    let response = service.execute(principal, &request)?;
    serde_json::to_value(response)
        .map_err(|e| crate::query::QueryError::Internal(format!("serialize response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryError;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn create_config(temp_dir: &TempDir) -> std::path::PathBuf {
        let config_path = temp_dir.path().join("datalake.json");
        let root = temp_dir.path().join("lake");
        fs::create_dir_all(root.join("orders")).unwrap();
        fs::write(
            root.join("orders/2024.jsonl"),
            "{\"id\": 1}\n{\"id\": 2}\nnot json\n",
        )
        .unwrap();

        let config = json!({
            "root": root.to_string_lossy(),
            "access": {
                "grants": [{"principal": "alice", "path": "orders"}]
            }
        });

        fs::write(&config_path, config.to_string()).unwrap();
        config_path
    }

    fn common(config: std::path::PathBuf, root: Option<std::path::PathBuf>) -> CommonArgs {
        CommonArgs { config, root }
    }

    #[test]
    fn test_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(&common(create_config(&temp_dir), None)).unwrap();
        assert!(config.root.ends_with("lake"));
        assert_eq!(config.access.grants.len(), 1);
    }

    #[test]
    fn test_root_override_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let args = common(
            temp_dir.path().join("missing.json"),
            Some(temp_dir.path().to_path_buf()),
        );
        let config = load_config(&args).unwrap();
        assert_eq!(config.root, temp_dir.path());
    }

    #[test]
    fn test_missing_config_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_config(&common(temp_dir.path().join("missing.json"), None)).unwrap_err();
        assert_eq!(err.code_str(), "DATALAKE_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_run_query() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(&common(create_config(&temp_dir), None)).unwrap();
        let service = build_service(&config).unwrap();

        let data = run_query(
            &service,
            &Principal::named("alice"),
            &json!({"path": "orders/2024.jsonl", "filters": {"id": {"gt": 1}}}),
        )
        .unwrap();

        assert_eq!(data["fileInfo"]["path"], "orders/2024.jsonl");
        assert_eq!(data["results"]["totalCount"], 1);
        assert_eq!(data["results"]["items"][0]["id"], 2);
    }

    #[test]
    fn test_run_query_forbidden() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(&common(create_config(&temp_dir), None)).unwrap();
        let service = build_service(&config).unwrap();

        let result = run_query(
            &service,
            &Principal::named("bob"),
            &json!({"path": "orders/2024.jsonl"}),
        );
        assert!(matches!(result, Err(QueryError::Forbidden(_))));
    }
}
