//! Query validation errors
//!
//! Every variant is raised before any statement executes and maps to
//! HTTP 400.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("key must be between 2 and 100 characters")]
    KeyLength,

    #[error("at least one of fields, count or sum is required")]
    MissingProjection,

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("invalid field path '{0}'")]
    InvalidField(String),

    #[error("field '{field}' is not allowed for type '{doc_type}'")]
    FieldNotAllowed { doc_type: String, field: String },

    #[error("invalid term: {0}")]
    InvalidTerm(String),

    #[error("unknown relation '{0}'")]
    InvalidRelation(String),

    #[error("term_relation must be AND or OR, got '{0}'")]
    InvalidTermRelation(String),

    #[error("sort order must be asc or desc, got '{0}'")]
    InvalidSortOrder(String),

    #[error("aggregation conflict: {0}")]
    AggregationConflict(String),
}

impl ValidationError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::KeyLength => "KEY_LENGTH",
            ValidationError::MissingProjection => "MISSING_PROJECTION",
            ValidationError::InvalidId(_) => "INVALID_ID",
            ValidationError::InvalidField(_) => "INVALID_FIELD",
            ValidationError::FieldNotAllowed { .. } => "FIELD_NOT_ALLOWED",
            ValidationError::InvalidTerm(_) => "INVALID_TERM",
            ValidationError::InvalidRelation(_) => "INVALID_RELATION",
            ValidationError::InvalidTermRelation(_) => "INVALID_TERM_RELATION",
            ValidationError::InvalidSortOrder(_) => "INVALID_SORT_ORDER",
            ValidationError::AggregationConflict(_) => "AGGREGATION_CONFLICT",
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;
