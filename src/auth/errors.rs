//! # Auth Errors
//!
//! Every variant is terminal for the request; nothing is retried.

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Access gate errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization: Bearer <token>` header, or an empty token
    #[error("Missing bearer token")]
    MissingToken,

    /// No credential matched, or more than one did
    #[error("Invalid token")]
    InvalidToken,

    /// The credential exists but is disabled
    #[error("Token is inactive")]
    TokenInactive,

    /// The credential store failed
    #[error("Credential lookup failed: {0}")]
    Backend(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::TokenInactive => 401,
            AuthError::Backend(_) => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::TokenInactive => "TOKEN_INACTIVE",
            AuthError::Backend(_) => "AUTH_BACKEND",
        }
    }

    /// Returns whether this error should be logged at warn level
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl From<crate::store::StoreError> for AuthError {
    fn from(err: crate::store::StoreError) -> Self {
        AuthError::Backend(err.to_string())
    }
}
