//! # Document Store
//!
//! Connection lifecycle and the storage collaborator interface.
//!
//! The query executor and the raw-query gate share one [`Connection`].
//! It connects lazily on first use and can be closed any number of times.

pub mod connection;
pub mod errors;
pub mod param;
pub mod postgres;

pub use connection::{BoxFuture, Connection, StoreClient};
pub use errors::{StoreError, StoreResult};
pub use param::SqlParam;
pub use postgres::{DatabaseConfig, PgClient};

/// One result row: column name to value, in column order.
pub type StoreRow = serde_json::Map<String, serde_json::Value>;
