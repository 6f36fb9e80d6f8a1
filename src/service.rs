//! # Service Wiring
//!
//! Builds the shared connection and every component that uses it from a
//! validated configuration.

use std::sync::Arc;

use crate::auth::{AccessGate, TableCredentialStore};
use crate::config::{ConfigResult, ServiceConfig};
use crate::executor::QueryExecutor;
use crate::gate::{PluginHost, RawQueryGate, RawQueryValidator};
use crate::observability::MetricsRegistry;
use crate::rest_api::{ApiServer, ApiState};
use crate::statement::StatementBuilder;
use crate::store::{Connection, PgClient, StoreClient};

/// Every long-lived component, sharing one connection
pub struct Services {
    pub connection: Arc<Connection>,
    pub metrics: Arc<MetricsRegistry>,
    pub executor: Arc<QueryExecutor>,
    pub gate: Arc<AccessGate>,
    pub plugins: Arc<PluginHost>,
}

impl Services {
    /// Wire components over PostgreSQL
    pub fn from_config(config: &ServiceConfig) -> ConfigResult<Self> {
        Self::with_client(config, Arc::new(PgClient::new(config.database.clone())))
    }

    /// Wire components over any store client
    pub fn with_client(config: &ServiceConfig, client: Arc<dyn StoreClient>) -> ConfigResult<Self> {
        config.validate()?;

        let connection = Arc::new(Connection::from_arc(client));
        let metrics = Arc::new(MetricsRegistry::new());

        let executor = Arc::new(QueryExecutor::new(
            connection.clone(),
            StatementBuilder::new(&config.tables.documents),
            config.field_allow_list()?,
            config.query_limits(),
            metrics.clone(),
        ));

        let credentials = TableCredentialStore::new(
            connection.clone(),
            &config.tables.credentials,
            config.tables.credential_type.clone(),
        );
        let gate = Arc::new(AccessGate::new(Arc::new(credentials), metrics.clone()));

        let raw_gate = RawQueryGate::new(
            connection.clone(),
            RawQueryValidator::new(config.plugins.allowed_table.clone()),
            metrics.clone(),
        );
        let plugins = Arc::new(PluginHost::new(Arc::new(raw_gate)));

        Ok(Self {
            connection,
            metrics,
            executor,
            gate,
            plugins,
        })
    }

    pub fn api_state(&self) -> ApiState {
        ApiState {
            gate: self.gate.clone(),
            executor: self.executor.clone(),
            metrics: self.metrics.clone(),
        }
    }

    pub fn api_server(&self, config: &ServiceConfig) -> ApiServer {
        ApiServer::new(config.http.clone(), self.api_state())
    }
}
