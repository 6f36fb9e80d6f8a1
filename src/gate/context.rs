//! Raw-query gate and the per-tenant plugin context

use std::sync::Arc;

use serde_json::Value;

use crate::auth::crypto::generate_id;
use crate::observability::{Logger, MetricsRegistry};
use crate::store::{Connection, SqlParam};

use super::errors::{RawQueryError, RawQueryResult};
use super::validator::RawQueryValidator;

/// Validates plugin statements and forwards accepted ones to the shared connection
pub struct RawQueryGate {
    connection: Arc<Connection>,
    validator: RawQueryValidator,
    metrics: Arc<MetricsRegistry>,
}

impl RawQueryGate {
    pub fn new(
        connection: Arc<Connection>,
        validator: RawQueryValidator,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            connection,
            validator,
            metrics,
        }
    }

    pub fn validator(&self) -> &RawQueryValidator {
        &self.validator
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Run `sql` for `plugin` once every check passes
    pub async fn query(
        &self,
        plugin: &str,
        sql: &str,
        params: &[Value],
    ) -> RawQueryResult<Vec<Value>> {
        if let Err(err) = self.validator.validate(sql) {
            self.metrics.increment_raw_queries_rejected();
            Logger::warn(
                "RAW_QUERY_REJECTED",
                &[
                    ("plugin", plugin),
                    ("code", err.code()),
                    ("reason", &err.to_string()),
                ],
            );
            return Err(err);
        }

        let params: Vec<SqlParam> = params.iter().map(SqlParam::from_json).collect();
        let rows = self.connection.query(sql, &params).await?;
        self.metrics.increment_raw_queries_executed();
        Ok(rows.into_iter().map(Value::Object).collect())
    }
}

/// Capability handed to one plugin for one tenant
#[derive(Clone)]
pub struct PluginContext {
    gate: Arc<RawQueryGate>,
    plugin: String,
    sid: String,
}

impl PluginContext {
    pub(crate) fn new(gate: Arc<RawQueryGate>, plugin: String, sid: String) -> Self {
        Self { gate, plugin, sid }
    }

    /// Tenant this context was issued for
    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>, RawQueryError> {
        self.gate.query(&self.plugin, sql, params).await
    }

    /// Fresh document identifier
    pub fn make_id(&self) -> String {
        generate_id()
    }

    /// Release the shared connection; repeated calls are no-ops
    pub async fn close(&self) {
        self.gate.connection.close().await
    }

    pub async fn end(&self) {
        self.close().await
    }
}
