//! # Store Errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the storage collaborator
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Could not obtain a connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// The statement failed to execute or decode
    #[error("Statement error: {0}")]
    Statement(String),
}

impl StoreError {
    /// Error code for logs and metrics
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Connection(_) => "STORE_CONNECTION",
            StoreError::Statement(_) => "STORE_STATEMENT",
        }
    }
}
