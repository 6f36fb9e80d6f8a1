//! Caller-facing result shapes

use serde::Serialize;
use serde_json::Value;

/// `data` of a scan result: one document for `get`, a list otherwise
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PageData {
    One(Value),
    Many(Vec<Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub total_records: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Result of one executed query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    /// Single-id `get`; `{}` when nothing matched
    Single(Value),
    /// Id-list lookups
    List(Vec<Value>),
    /// Scan with paging metadata
    Page { data: PageData, meta: PageMeta },
}

impl QueryOutcome {
    /// Number of documents carried
    pub fn len(&self) -> usize {
        match self {
            QueryOutcome::Single(v) => usize::from(v.as_object().map_or(true, |o| !o.is_empty())),
            QueryOutcome::List(items) => items.len(),
            QueryOutcome::Page {
                data: PageData::One(_),
                ..
            } => 1,
            QueryOutcome::Page {
                data: PageData::Many(items),
                ..
            } => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
