//! Executor errors

use thiserror::Error;

use crate::query::ValidationError;
use crate::store::StoreError;

/// Failure while planning or running a query
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// Rejected before any statement ran
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store failed; the request is aborted
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Validation(e) => e.code(),
            QueryError::Store(e) => e.code(),
        }
    }

    /// Whether the caller caused the failure
    pub fn is_client_error(&self) -> bool {
        matches!(self, QueryError::Validation(_))
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
