//! # HTTP Server
//!
//! Axum router for the query endpoint plus health and metrics.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::auth::AccessGate;
use crate::executor::QueryExecutor;
use crate::observability::{Logger, MetricsRegistry};

use super::config::HttpServerConfig;
use super::handler::{health_handler, metrics_handler, query_handler};

/// Shared handler state
#[derive(Clone)]
pub struct ApiState {
    pub gate: Arc<AccessGate>,
    pub executor: Arc<QueryExecutor>,
    pub metrics: Arc<MetricsRegistry>,
}

/// HTTP server over the query executor
pub struct ApiServer {
    config: HttpServerConfig,
    router: Router,
}

impl ApiServer {
    pub fn new(config: HttpServerConfig, state: ApiState) -> Self {
        let router = Self::build_router(&config, state);
        Self { config, router }
    }

    fn build_router(config: &HttpServerConfig, state: ApiState) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/api/v1/query", post(query_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(cors)
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until Ctrl-C
    pub async fn start(self) -> Result<(), std::io::Error> {
        self.start_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Bind and serve until `shutdown` resolves
    pub async fn start_with_shutdown<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid socket address '{}': {}", self.config.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        Logger::info(
            "SERVER_START",
            &[
                ("addr", &addr.to_string()),
                ("version", env!("CARGO_PKG_VERSION")),
            ],
        );
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
