//! Positional parameter binding

use crate::store::SqlParam;

/// Collects bound values and hands out `$n` placeholders
#[derive(Debug, Clone, Default)]
pub struct Binder {
    params: Vec<SqlParam>,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value and return its placeholder
    pub fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    pub fn bind_text(&mut self, value: impl Into<String>) -> String {
        self.bind(SqlParam::text(value))
    }

    /// Values bound so far
    pub fn snapshot(&self) -> Vec<SqlParam> {
        self.params.clone()
    }

    pub fn into_params(self) -> Vec<SqlParam> {
        self.params
    }
}
