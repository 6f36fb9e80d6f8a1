//! # Access Credentials
//!
//! Credentials are read-only to this service. The table store looks them
//! up by exact token equality on the shared connection.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{BoxFuture, Connection, SqlParam, StoreRow};

use super::errors::{AuthError, AuthResult};

/// Permission level attached to a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    Read,
    Write,
    Admin,
}

impl Permission {
    /// Unknown strings resolve to `Read`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "write" => Permission::Write,
            "admin" => Permission::Admin,
            _ => Permission::Read,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Admin => "admin",
        }
    }
}

/// One stored credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCredential {
    pub token: String,
    pub tenant_id: String,
    pub permission: Permission,
    pub active: bool,
}

impl AccessCredential {
    /// Decode a credential row (`token, sid, permission, active`)
    pub fn from_row(row: &StoreRow) -> AuthResult<Self> {
        let text = |column: &str| -> AuthResult<String> {
            match row.get(column) {
                Some(Value::String(s)) => Ok(s.clone()),
                _ => Err(AuthError::Backend(format!(
                    "credential row is missing '{}'",
                    column
                ))),
            }
        };

        let active = match row.get("active") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.trim(), "true" | "t" | "1"),
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        };

        let permission = match row.get("permission") {
            Some(Value::String(s)) => Permission::parse(s),
            _ => Permission::Read,
        };

        Ok(Self {
            token: text("token")?,
            tenant_id: text("sid")?,
            permission,
            active,
        })
    }
}

/// Credential lookup collaborator
pub trait CredentialStore: Send + Sync {
    /// Every credential whose token equals `token` exactly
    fn lookup<'a>(&'a self, token: &'a str) -> BoxFuture<'a, AuthResult<Vec<AccessCredential>>>;
}

/// Credential store over the credential table
pub struct TableCredentialStore {
    connection: Arc<Connection>,
    sql: String,
    credential_type: String,
}

impl TableCredentialStore {
    /// `table` must already be validated as an identifier
    pub fn new(connection: Arc<Connection>, table: &str, credential_type: impl Into<String>) -> Self {
        let sql = format!(
            "SELECT token, sid, permission, active::text AS active FROM {} \
             WHERE type = $1 AND token = $2 LIMIT 2",
            table
        );
        Self {
            connection,
            sql,
            credential_type: credential_type.into(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl CredentialStore for TableCredentialStore {
    fn lookup<'a>(&'a self, token: &'a str) -> BoxFuture<'a, AuthResult<Vec<AccessCredential>>> {
        Box::pin(async move {
            let params = [
                SqlParam::text(self.credential_type.clone()),
                SqlParam::text(token),
            ];
            let rows = self.connection.query(&self.sql, &params).await?;
            rows.iter().map(AccessCredential::from_row).collect()
        })
    }
}

/// In-memory credential store
#[derive(Default)]
pub struct InMemoryCredentialStore {
    credentials: RwLock<Vec<AccessCredential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, credential: AccessCredential) {
        if let Ok(mut credentials) = self.credentials.write() {
            credentials.push(credential);
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn lookup<'a>(&'a self, token: &'a str) -> BoxFuture<'a, AuthResult<Vec<AccessCredential>>> {
        Box::pin(async move {
            let credentials = self
                .credentials
                .read()
                .map_err(|_| AuthError::Backend("Lock poisoned".to_string()))?;
            Ok(credentials
                .iter()
                .filter(|c| c.token == token)
                .cloned()
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> StoreRow {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!(Permission::parse("admin"), Permission::Admin);
        assert_eq!(Permission::parse("WRITE"), Permission::Write);
        assert_eq!(Permission::parse("read"), Permission::Read);
        assert_eq!(Permission::parse("superuser"), Permission::Read);
    }

    #[test]
    fn test_from_row() {
        let credential = AccessCredential::from_row(&row(json!({
            "token": "tok", "sid": "acme", "permission": "write", "active": "true"
        })))
        .unwrap();
        assert_eq!(credential.tenant_id, "acme");
        assert_eq!(credential.permission, Permission::Write);
        assert!(credential.active);

        let inactive = AccessCredential::from_row(&row(json!({
            "token": "tok", "sid": "acme", "permission": null, "active": "false"
        })))
        .unwrap();
        assert!(!inactive.active);
        assert_eq!(inactive.permission, Permission::Read);
    }

    #[test]
    fn test_from_row_missing_column() {
        let result = AccessCredential::from_row(&row(json!({"token": "tok"})));
        assert!(matches!(result, Err(AuthError::Backend(_))));
    }

    #[test]
    fn test_table_store_sql_binds_type_and_token() {
        struct Never;
        impl crate::store::StoreClient for Never {
            fn connect(&self) -> BoxFuture<'_, crate::store::StoreResult<()>> {
                Box::pin(async { Ok(()) })
            }
            fn query<'a>(
                &'a self,
                _sql: &'a str,
                _params: &'a [SqlParam],
            ) -> BoxFuture<'a, crate::store::StoreResult<Vec<StoreRow>>> {
                Box::pin(async { Ok(Vec::new()) })
            }
            fn close(&self) -> BoxFuture<'_, ()> {
                Box::pin(async {})
            }
            fn name(&self) -> &'static str {
                "never"
            }
        }

        let store = TableCredentialStore::new(Arc::new(Connection::new(Never)), "api_keys", "api-key");
        assert_eq!(
            store.sql(),
            "SELECT token, sid, permission, active::text AS active FROM api_keys \
             WHERE type = $1 AND token = $2 LIMIT 2"
        );
    }

    #[tokio::test]
    async fn test_in_memory_lookup() {
        let store = InMemoryCredentialStore::new();
        store.insert(AccessCredential {
            token: "tok-a".into(),
            tenant_id: "acme".into(),
            permission: Permission::Read,
            active: true,
        });

        assert_eq!(store.lookup("tok-a").await.unwrap().len(), 1);
        assert!(store.lookup("tok-b").await.unwrap().is_empty());
    }
}
