//! In-memory store for integration tests
//!
//! Interprets the statement shapes this crate emits closely enough to
//! exercise tenant scoping, projection, id lookups, text equality terms,
//! ungrouped aggregates and paging. Every statement is recorded.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, OnceLock};

use regex::Regex;
use serde_json::{json, Map, Value};

use tenantql::config::ServiceConfig;
use tenantql::service::Services;
use tenantql::store::{BoxFuture, SqlParam, StoreClient, StoreResult, StoreRow};

pub const TOKEN_ACME: &str = "tok-acme-0001";
pub const TOKEN_GLOBEX: &str = "tok-globex-0001";
pub const TOKEN_INACTIVE: &str = "tok-inactive-0001";

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: String,
    pub doc_type: String,
    pub sid: String,
    pub document: Value,
}

#[derive(Debug, Clone)]
pub struct StoredCredential {
    pub token: String,
    pub sid: String,
    pub permission: String,
    pub active: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<StoredDocument>>,
    credentials: Mutex<Vec<StoredCredential>>,
    statements: Mutex<Vec<(String, Vec<SqlParam>)>>,
}

fn re(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap())
}

fn projection_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, r#"\(document #> '\{([^}]*)\}'\)::text AS "([^"]+)""#)
}

fn sum_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(
        &RE,
        r#"SUM\(CASE WHEN jsonb_typeof\(document #> '\{([^}]*)\}'\) = 'number' THEN \(document #>> '\{[^}]*\}'\)::numeric ELSE 0 END\)::text AS "([^"]+)""#,
    )
}

fn count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, r#"COUNT\(document #> '\{([^}]*)\}'\)::text AS "([^"]+)""#)
}

fn id_eq_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, r"AND id = \$(\d+)")
}

fn id_in_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, r"AND id IN \(([^)]*)\)")
}

fn text_eq_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, r"document #>> '\{([^}]*)\}' = \$(\d+)")
}

fn page_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, r"LIMIT \$(\d+) OFFSET \$(\d+)")
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    re(&RE, r"\$(\d+)")
}

fn lookup<'v>(document: &'v Value, path: &str) -> Option<&'v Value> {
    path.split(',').try_fold(document, |value, segment| value.get(segment))
}

fn param_text(params: &[SqlParam], index: &str) -> Option<String> {
    let index: usize = index.parse().ok()?;
    match params.get(index.checked_sub(1)?)? {
        SqlParam::Text(s) => Some(s.clone()),
        SqlParam::Integer(i) => Some(i.to_string()),
        other => Some(other.to_json().to_string()),
    }
}

fn param_int(params: &[SqlParam], index: &str) -> i64 {
    param_text(params, index)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn render_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, id: &str, doc_type: &str, sid: &str, document: Value) {
        self.documents.lock().unwrap().push(StoredDocument {
            id: id.to_string(),
            doc_type: doc_type.to_string(),
            sid: sid.to_string(),
            document,
        });
    }

    pub fn credential(&self, token: &str, sid: &str, active: bool) {
        self.credentials.lock().unwrap().push(StoredCredential {
            token: token.to_string(),
            sid: sid.to_string(),
            permission: "read".to_string(),
            active,
        });
    }

    pub fn statements(&self) -> Vec<(String, Vec<SqlParam>)> {
        self.statements.lock().unwrap().clone()
    }

    /// Statements against the document table only
    pub fn document_statements(&self) -> Vec<(String, Vec<SqlParam>)> {
        self.statements()
            .into_iter()
            .filter(|(sql, _)| sql.contains("FROM data") || sql.contains("FROM (SELECT 1 FROM data"))
            .collect()
    }

    fn credential_rows(&self, params: &[SqlParam]) -> Vec<Value> {
        let token = params.get(1).and_then(SqlParam::as_text).unwrap_or_default();
        self.credentials
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.token == token)
            .map(|c| {
                json!({
                    "token": c.token,
                    "sid": c.sid,
                    "permission": c.permission,
                    "active": c.active.to_string(),
                })
            })
            .collect()
    }

    fn matching(&self, sql: &str, params: &[SqlParam]) -> Vec<StoredDocument> {
        let doc_type = params.first().and_then(SqlParam::as_text).unwrap_or_default();
        let sid = params.get(1).and_then(SqlParam::as_text).unwrap_or_default();

        let mut ids: Option<Vec<String>> = None;
        if let Some(c) = id_eq_re().captures(sql) {
            ids = param_text(params, &c[1]).map(|id| vec![id]);
        } else if let Some(c) = id_in_re().captures(sql) {
            ids = Some(
                placeholder_re()
                    .captures_iter(&c[1])
                    .filter_map(|p| param_text(params, &p[1]))
                    .collect(),
            );
        }

        let conditions: Vec<(String, String)> = text_eq_re()
            .captures_iter(sql)
            .filter_map(|c| Some((c[1].to_string(), param_text(params, &c[2])?)))
            .collect();
        let any = sql.contains(" OR ");

        self.documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.doc_type == doc_type && d.sid == sid)
            .filter(|d| ids.as_ref().map_or(true, |ids| ids.contains(&d.id)))
            .filter(|d| {
                if conditions.is_empty() {
                    return true;
                }
                let hit = |(path, expected): &(String, String)| {
                    lookup(&d.document, path).map_or(false, |v| match v {
                        Value::String(s) => s == expected,
                        other => &other.to_string() == expected,
                    })
                };
                if any {
                    conditions.iter().any(hit)
                } else {
                    conditions.iter().all(hit)
                }
            })
            .cloned()
            .collect()
    }

    fn project(sql: &str, document: &StoredDocument) -> Value {
        let mut row = Map::new();
        if sql.contains("id AS \"_id\"") {
            row.insert("_id".into(), Value::String(document.id.clone()));
        }
        if sql.contains("document::text AS \"document\"") {
            row.insert("document".into(), Value::String(document.document.to_string()));
        }
        for c in projection_re().captures_iter(sql) {
            let value = lookup(&document.document, &c[1])
                .map(|v| Value::String(v.to_string()))
                .unwrap_or(Value::Null);
            row.insert(c[2].to_string(), value);
        }
        Value::Object(row)
    }

    fn aggregate(sql: &str, documents: &[StoredDocument]) -> Value {
        let mut row = Map::new();
        for c in sum_re().captures_iter(sql) {
            let total: f64 = documents
                .iter()
                .filter_map(|d| lookup(&d.document, &c[1]).and_then(Value::as_f64))
                .sum();
            row.insert(c[2].to_string(), Value::String(render_number(total)));
        }
        for c in count_re().captures_iter(sql) {
            let count = documents
                .iter()
                .filter(|d| lookup(&d.document, &c[1]).is_some())
                .count();
            row.insert(c[2].to_string(), Value::String(count.to_string()));
        }
        Value::Object(row)
    }

    fn run(&self, sql: &str, params: &[SqlParam]) -> Vec<Value> {
        if sql.contains("FROM api_keys") {
            return self.credential_rows(params);
        }

        let documents = self.matching(sql, params);
        if sql.starts_with("SELECT COUNT(*)::text AS total") {
            return vec![json!({"total": documents.len().to_string()})];
        }
        if sum_re().is_match(sql) || count_re().is_match(sql) {
            return vec![Self::aggregate(sql, &documents)];
        }

        let (offset, limit) = match page_re().captures(sql) {
            Some(c) => (param_int(params, &c[2]), param_int(params, &c[1])),
            None if sql.ends_with("LIMIT 1") => (0, 1),
            None => (0, i64::MAX),
        };

        documents
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|d| Self::project(sql, d))
            .collect()
    }
}

impl StoreClient for MemoryStore {
    fn connect(&self) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [SqlParam],
    ) -> BoxFuture<'a, StoreResult<Vec<StoreRow>>> {
        Box::pin(async move {
            self.statements
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            Ok(self
                .run(sql, params)
                .into_iter()
                .filter_map(|v| v.as_object().cloned())
                .collect())
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Two tenants with overlapping document types plus three credentials
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.credential(TOKEN_ACME, "acme", true);
    store.credential(TOKEN_GLOBEX, "globex", true);
    store.credential(TOKEN_INACTIVE, "acme", false);

    store.insert(
        "acme-order-0001",
        "orders",
        "acme",
        json!({"status": "open", "amount": 10, "customer": {"name": "Ada"}}),
    );
    store.insert(
        "acme-order-0002",
        "orders",
        "acme",
        json!({"status": "held", "amount": 20, "customer": {"name": "Grace"}}),
    );
    store.insert(
        "acme-order-0003",
        "orders",
        "acme",
        json!({"status": "open", "amount": 30, "customer": {"name": "Edsger"}}),
    );
    store.insert(
        "globex-order-0001",
        "orders",
        "globex",
        json!({"status": "open", "amount": 999, "customer": {"name": "Hank"}}),
    );
    store
}

/// Services over `store` with default configuration
pub fn services(store: Arc<MemoryStore>) -> Services {
    Services::with_client(&ServiceConfig::default(), store).unwrap()
}
