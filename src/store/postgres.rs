//! # PostgreSQL Store Client
//!
//! `StoreClient` backed by a deadpool-postgres pool. Documents live in one
//! table:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS data (
//!     id TEXT PRIMARY KEY,
//!     ref TEXT NOT NULL,
//!     sid TEXT NOT NULL,
//!     document JSONB NOT NULL
//! );
//! ```

use std::sync::RwLock;
use std::time::Duration;

use deadpool_postgres::{Config, Pool, Runtime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{NoTls, Row};

use super::connection::{BoxFuture, StoreClient};
use super::errors::{StoreError, StoreResult};
use super::param::SqlParam;
use super::StoreRow;

/// Connection settings for the PostgreSQL store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL host.
    #[serde(default = "default_host")]
    pub host: String,

    /// PostgreSQL port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    #[serde(default = "default_dbname")]
    pub dbname: String,

    /// Database user.
    #[serde(default = "default_user")]
    pub user: String,

    /// Database password.
    #[serde(default)]
    pub password: Option<String>,

    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_dbname() -> String {
    "tenantql".to_string()
}

fn default_user() -> String {
    "tenantql".to_string()
}

fn default_max_connections() -> usize {
    10
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dbname: default_dbname(),
            user: default_user(),
            password: None,
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// PostgreSQL client; the pool is created by `connect()`
pub struct PgClient {
    config: DatabaseConfig,
    pool: RwLock<Option<Pool>>,
}

impl PgClient {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
        }
    }

    fn create_pool(config: &DatabaseConfig) -> StoreResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(config.host.clone());
        cfg.port = Some(config.port);
        cfg.dbname = Some(config.dbname.clone());
        cfg.user = Some(config.user.clone());
        cfg.password = config.password.clone();
        cfg.connect_timeout = Some(Duration::from_secs(config.connect_timeout_secs));

        cfg.builder(NoTls)
            .map_err(|e| StoreError::Connection(format!("Failed to create pool builder: {}", e)))?
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    fn current_pool(&self) -> StoreResult<Pool> {
        self.pool
            .read()
            .map_err(|_| StoreError::Connection("Lock poisoned".to_string()))?
            .clone()
            .ok_or_else(|| StoreError::Connection("Not connected".to_string()))
    }
}

impl StoreClient for PgClient {
    fn connect(&self) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let pool = Self::create_pool(&self.config)?;

            // Verify connectivity before publishing the pool
            let client = pool
                .get()
                .await
                .map_err(|e| StoreError::Connection(e.to_string()))?;
            drop(client);

            let mut slot = self
                .pool
                .write()
                .map_err(|_| StoreError::Connection("Lock poisoned".to_string()))?;
            *slot = Some(pool);
            Ok(())
        })
    }

    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [SqlParam],
    ) -> BoxFuture<'a, StoreResult<Vec<StoreRow>>> {
        Box::pin(async move {
            let pool = self.current_pool()?;
            let client = pool
                .get()
                .await
                .map_err(|e| StoreError::Connection(e.to_string()))?;

            let boxed: Vec<Box<dyn ToSql + Sync + Send>> = params.iter().map(boxed_param).collect();
            let param_refs: Vec<&(dyn ToSql + Sync)> = boxed
                .iter()
                .map(|p| p.as_ref() as &(dyn ToSql + Sync))
                .collect();

            let rows = client
                .query(sql, &param_refs)
                .await
                .map_err(|e| StoreError::Statement(e.to_string()))?;

            rows.iter().map(decode_row).collect()
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let pool = match self.pool.write() {
                Ok(mut slot) => slot.take(),
                Err(_) => None,
            };
            if let Some(pool) = pool {
                pool.close();
            }
        })
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

fn boxed_param(param: &SqlParam) -> Box<dyn ToSql + Sync + Send> {
    match param {
        SqlParam::Text(s) => Box::new(s.clone()),
        SqlParam::Integer(i) => Box::new(*i),
        SqlParam::Float(f) => Box::new(*f),
        SqlParam::Bool(b) => Box::new(*b),
        SqlParam::Json(v) => Box::new(v.clone()),
        SqlParam::Null => Box::new(Option::<String>::None),
    }
}

fn decode_row(row: &Row) -> StoreResult<StoreRow> {
    let mut out = StoreRow::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_())?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

fn decode_column(row: &Row, idx: usize, ty: &Type) -> StoreResult<Value> {
    let decoded = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx).map(|v| v.map(Value::Bool))
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx).map(|v| v.map(Value::from))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx).map(|v| v.map(Value::from))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx).map(|v| v.map(Value::from))
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)
            .map(|v| v.map(|f| Value::from(f64::from(f))))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx).map(|v| v.map(Value::from))
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<Value>>(idx)
    } else {
        // Types without a direct JSON mapping come back as null unless text
        return Ok(row
            .try_get::<_, Option<String>>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null));
    };

    decoded
        .map(|v| v.unwrap_or(Value::Null))
        .map_err(|e| StoreError::Statement(e.to_string()))
}
