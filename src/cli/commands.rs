//! CLI command implementations

use std::path::Path;

use serde_json::{json, Value};

use crate::config::ServiceConfig;
use crate::query::QueryRequest;
use crate::service::Services;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_json};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Start { config } => start(&config),
        Command::Explain { config, tenant } => explain(&config, &tenant),
        Command::CheckConfig { config } => check_config(&config),
    }
}

/// Serve HTTP until Ctrl-C, then tear the plugin host down
pub fn start(config_path: &Path) -> CliResult<()> {
    let config = ServiceConfig::load(config_path)?;
    let services = Services::from_config(&config)?;
    let server = services.api_server(&config);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        services.plugins.init();

        let served = server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)));

        services
            .plugins
            .teardown()
            .await
            .map_err(|e| CliError::boot_failed(e.to_string()))?;
        served
    })
}

/// Plan the stdin request for `tenant` and print its statements
pub fn explain(config_path: &Path, tenant: &str) -> CliResult<()> {
    let config = ServiceConfig::load(config_path)?;
    let plan = explain_request(&config, tenant, read_request()?)?;
    write_json(&plan)
}

pub(crate) fn explain_request(
    config: &ServiceConfig,
    tenant: &str,
    request: Value,
) -> CliResult<Value> {
    let request: QueryRequest = serde_json::from_value(request)?;
    let services = Services::from_config(config)?;
    let (query, plan) = services.executor.plan(&request, tenant)?;

    Ok(json!({
        "type": query.doc_type,
        "tenant": tenant,
        "plan": plan.to_json(),
    }))
}

/// Validate a configuration file and print a summary
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let config = ServiceConfig::load(config_path)?;
    write_json(&config_summary(&config))
}

fn config_summary(config: &ServiceConfig) -> Value {
    let mut typed: Vec<&String> = config.fields.keys().collect();
    typed.sort();

    json!({
        "status": "ok",
        "http": config.http.socket_addr(),
        "database": format!(
            "{}:{}/{}",
            config.database.host, config.database.port, config.database.dbname
        ),
        "tables": {
            "documents": config.tables.documents,
            "credentials": config.tables.credentials,
        },
        "query": {
            "default_limit": config.query.default_limit,
            "max_limit": config.query.max_limit,
        },
        "typed_vocabularies": typed,
        "plugins": { "allowed_table": config.plugins.allowed_table },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    use crate::cli::errors::CliErrorCode;

    #[test]
    fn test_explain_scan_plan() {
        let config = ServiceConfig::default();
        let out = explain_request(
            &config,
            "acme",
            json!({"key": "orders", "fields": ["status"], "limit": 5}),
        )
        .unwrap();

        assert_eq!(out["type"], "orders");
        assert_eq!(out["plan"]["path"], "scan");
        let params = out["plan"]["select"]["params"].as_array().unwrap();
        assert_eq!(params[0], "orders");
        assert_eq!(params[1], "acme");
        assert!(out["plan"]["count"]["sql"]
            .as_str()
            .unwrap()
            .starts_with("SELECT COUNT(*)"));
    }

    #[test]
    fn test_explain_rejects_invalid_request() {
        let err = explain_request(&ServiceConfig::default(), "acme", json!({"key": "o"}))
            .unwrap_err();
        assert_eq!(err.code(), CliErrorCode::PlanFailed);
    }

    #[test]
    fn test_check_config_rejects_bad_table() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"tables": {{"documents": "data; drop"}}}}"#).unwrap();

        let err = check_config(file.path()).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::ConfigError);
    }

    #[test]
    fn test_config_summary() {
        let mut config = ServiceConfig::default();
        config
            .fields
            .insert("orders".to_string(), vec!["status".to_string()]);
        let summary = config_summary(&config);
        assert_eq!(summary["status"], "ok");
        assert_eq!(summary["typed_vocabularies"], json!(["orders"]));
        assert_eq!(summary["tables"]["documents"], "data");
    }
}
