//! # Access Gate
//!
//! Resolves `Authorization: Bearer <token>` to a tenant scope.

use std::sync::Arc;

use axum::http::{header, HeaderMap};

use crate::observability::{Logger, MetricsRegistry};

use super::credential::{CredentialStore, Permission};
use super::crypto::{constant_time_str_eq, token_fingerprint};
use super::errors::{AuthError, AuthResult};

/// Tenant and permission resolved from a credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessScope {
    pub tenant_id: String,
    pub permission: Permission,
}

/// Credential check in front of the query executor
pub struct AccessGate {
    store: Arc<dyn CredentialStore>,
    metrics: Arc<MetricsRegistry>,
}

impl AccessGate {
    pub fn new(store: Arc<dyn CredentialStore>, metrics: Arc<MetricsRegistry>) -> Self {
        Self { store, metrics }
    }

    /// Extract the bearer token; the scheme match ignores case
    pub fn bearer_token(headers: &HeaderMap) -> AuthResult<&str> {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .ok_or(AuthError::MissingToken)?;

        let (scheme, token) = value.split_once(char::is_whitespace).ok_or(AuthError::MissingToken)?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::MissingToken);
        }

        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(token)
    }

    /// Resolve a presented token to exactly one active credential
    pub async fn resolve(&self, token: &str) -> AuthResult<AccessScope> {
        let mut matches = self.store.lookup(token).await?;
        if matches.len() != 1 {
            return Err(AuthError::InvalidToken);
        }
        let credential = matches.remove(0);

        if !constant_time_str_eq(&credential.token, token) {
            return Err(AuthError::InvalidToken);
        }
        if !credential.active {
            return Err(AuthError::TokenInactive);
        }

        Ok(AccessScope {
            tenant_id: credential.tenant_id,
            permission: credential.permission,
        })
    }

    /// Full header check with logging and metrics
    pub async fn authorize(&self, headers: &HeaderMap) -> AuthResult<AccessScope> {
        let token = match Self::bearer_token(headers) {
            Ok(token) => token,
            Err(err) => {
                self.reject(&err, None);
                return Err(err);
            }
        };

        self.resolve(token).await.map_err(|err| {
            self.reject(&err, Some(token));
            err
        })
    }

    fn reject(&self, err: &AuthError, token: Option<&str>) {
        self.metrics.increment_auth_rejections();
        let fingerprint = token.map(token_fingerprint).unwrap_or_default();
        let fields = [("code", err.code()), ("token_fingerprint", fingerprint.as_str())];
        if err.is_client_error() {
            Logger::warn("AUTH_REJECTED", &fields);
        } else {
            Logger::error("AUTH_REJECTED", &fields);
        }
    }
}
