//! # Connection Lifecycle
//!
//! Lazy connect-on-first-use and idempotent close over a [`StoreClient`].

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::observability::Logger;

use super::errors::StoreResult;
use super::param::SqlParam;
use super::StoreRow;

/// Boxed future returned by store collaborators
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Storage collaborator consumed by this crate
pub trait StoreClient: Send + Sync {
    /// Establish the underlying connection (pool)
    fn connect(&self) -> BoxFuture<'_, StoreResult<()>>;

    /// Run one statement with positional parameters
    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [SqlParam],
    ) -> BoxFuture<'a, StoreResult<Vec<StoreRow>>>;

    /// Release the underlying connection
    fn close(&self) -> BoxFuture<'_, ()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Shared connection handle
///
/// Connects on the first query. `close()` and `end()` are idempotent; a
/// query issued after close connects again.
pub struct Connection {
    client: Arc<dyn StoreClient>,
    connected: AtomicBool,
    transition: Mutex<()>,
}

impl Connection {
    /// Wrap a store client
    pub fn new(client: impl StoreClient + 'static) -> Self {
        Self::from_arc(Arc::new(client))
    }

    /// Wrap an already shared store client
    pub fn from_arc(client: Arc<dyn StoreClient>) -> Self {
        Self {
            client,
            connected: AtomicBool::new(false),
            transition: Mutex::new(()),
        }
    }

    /// Whether the client is currently connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Run a statement, connecting first if needed
    pub async fn query(&self, sql: &str, params: &[SqlParam]) -> StoreResult<Vec<StoreRow>> {
        self.ensure_connected().await?;
        self.client.query(sql, params).await
    }

    async fn ensure_connected(&self) -> StoreResult<()> {
        if self.is_connected() {
            return Ok(());
        }

        let _guard = self.transition.lock().await;
        if self.is_connected() {
            return Ok(());
        }

        self.client.connect().await?;
        self.connected.store(true, Ordering::Release);
        Logger::info("STORE_CONNECTED", &[("backend", self.client.name())]);
        Ok(())
    }

    /// Close the connection; a no-op when not connected
    pub async fn close(&self) {
        let _guard = self.transition.lock().await;
        if !self.connected.swap(false, Ordering::AcqRel) {
            return;
        }

        self.client.close().await;
        Logger::info("STORE_CLOSED", &[("backend", self.client.name())]);
    }

    /// Alias of [`Connection::close`]
    pub async fn end(&self) {
        self.close().await
    }
}
