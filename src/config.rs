//! Service configuration
//!
//! Loaded from a JSON file. Every field has a default so an empty object
//! is a valid configuration:
//!
//! ```json
//! {
//!   "http": { "host": "0.0.0.0", "port": 8080 },
//!   "database": { "host": "localhost", "dbname": "tenantql" },
//!   "tables": { "documents": "data", "credentials": "api_keys" },
//!   "query": { "default_limit": 10, "max_limit": 1000 },
//!   "fields": { "orders": ["customer.name", "total"] },
//!   "plugins": { "allowed_table": "data" }
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::{FieldAllowList, QueryLimits, MAX_PAGE_LIMIT};
use crate::rest_api::HttpServerConfig;
use crate::statement::is_identifier;
use crate::store::DatabaseConfig;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Table names used to build statements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    /// Document table
    #[serde(default = "default_documents_table")]
    pub documents: String,

    /// Credential table read by the access gate
    #[serde(default = "default_credentials_table")]
    pub credentials: String,

    /// Credential `type` column value that marks an API key
    #[serde(default = "default_credential_type")]
    pub credential_type: String,
}

fn default_documents_table() -> String {
    "data".to_string()
}

fn default_credentials_table() -> String {
    "api_keys".to_string()
}

fn default_credential_type() -> String {
    "api-key".to_string()
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            documents: default_documents_table(),
            credentials: default_credentials_table(),
            credential_type: default_credential_type(),
        }
    }
}

/// Pagination bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_limit")]
    pub default_limit: i64,

    #[serde(default = "default_max_limit")]
    pub max_limit: i64,
}

fn default_limit() -> i64 {
    10
}

fn default_max_limit() -> i64 {
    MAX_PAGE_LIMIT
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

/// Raw-query gate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// The only table plugin statements may reference
    #[serde(default = "default_documents_table")]
    pub allowed_table: String,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            allowed_table: default_documents_table(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub http: HttpServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub tables: TablesConfig,

    #[serde(default)]
    pub query: QueryConfig,

    /// Optional per-type field vocabulary
    #[serde(default)]
    pub fields: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub plugins: PluginsConfig,
}

impl ServiceConfig {
    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json(&content)
    }

    /// Parse and validate configuration text
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: ServiceConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check table names and pagination bounds
    pub fn validate(&self) -> ConfigResult<()> {
        let tables = [
            ("tables.documents", &self.tables.documents),
            ("tables.credentials", &self.tables.credentials),
            ("plugins.allowed_table", &self.plugins.allowed_table),
        ];
        for (key, name) in tables {
            if !is_identifier(name) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a plain identifier, got '{}'",
                    key, name
                )));
            }
        }

        if self.tables.credential_type.is_empty() {
            return Err(ConfigError::Invalid(
                "tables.credential_type must not be empty".to_string(),
            ));
        }

        if self.query.max_limit < 1 || self.query.max_limit > MAX_PAGE_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "query.max_limit must be within [1, {}]",
                MAX_PAGE_LIMIT
            )));
        }
        if self.query.default_limit < 1 || self.query.default_limit > self.query.max_limit {
            return Err(ConfigError::Invalid(format!(
                "query.default_limit must be within [1, {}]",
                self.query.max_limit
            )));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be > 0".to_string(),
            ));
        }

        self.field_allow_list()?;
        Ok(())
    }

    /// Field vocabulary built from `fields`
    pub fn field_allow_list(&self) -> ConfigResult<FieldAllowList> {
        let mut allow_list = FieldAllowList::new();
        for (doc_type, paths) in &self.fields {
            allow_list
                .declare(doc_type, paths)
                .map_err(|e| ConfigError::Invalid(format!("fields.{}: {}", doc_type, e)))?;
        }
        Ok(allow_list)
    }

    /// Pagination bounds for request validation
    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            default_limit: self.query.default_limit,
            max_limit: self.query.max_limit,
        }
    }
}
