//! Raw-query gate and plugin host errors

use thiserror::Error;

use crate::store::StoreError;

/// Rejection or failure of one plugin statement
///
/// Fatal for that call only; the shared connection is unaffected.
#[derive(Debug, Clone, Error)]
pub enum RawQueryError {
    #[error("statement verb not allowed: {0}")]
    VerbNotAllowed(String),

    #[error("table not allowed: {0}")]
    TableNotAllowed(String),

    #[error("forbidden statement: {0}")]
    ForbiddenStatement(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RawQueryError {
    pub fn code(&self) -> &'static str {
        match self {
            RawQueryError::VerbNotAllowed(_) => "VERB_NOT_ALLOWED",
            RawQueryError::TableNotAllowed(_) => "TABLE_NOT_ALLOWED",
            RawQueryError::ForbiddenStatement(_) => "FORBIDDEN_STATEMENT",
            RawQueryError::Store(e) => e.code(),
        }
    }

    /// Whether the gate refused the statement before it reached the store
    pub fn is_rejection(&self) -> bool {
        !matches!(self, RawQueryError::Store(_))
    }
}

pub type RawQueryResult<T> = Result<T, RawQueryError>;

/// Plugin host errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("plugin host is not running")]
    HostNotRunning,

    #[error("unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error("plugin already registered: {0}")]
    AlreadyRegistered(String),

    #[error("plugin host error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_vs_store() {
        assert!(RawQueryError::VerbNotAllowed("WITH".into()).is_rejection());
        assert!(RawQueryError::TableNotAllowed("users".into()).is_rejection());
        let store = RawQueryError::from(StoreError::Connection("down".into()));
        assert!(!store.is_rejection());
        assert_eq!(store.code(), "STORE_CONNECTION");
    }
}
