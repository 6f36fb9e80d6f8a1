//! Field paths and the per-type field vocabulary

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::errors::{ValidationError, ValidationResult};

/// Longest accepted field path
pub const MAX_FIELD_PATH_LEN: usize = 128;

/// Structural identifier column exposed to callers as `_id`
pub const ID_FIELD: &str = "_id";

fn field_path_regex() -> &'static Regex {
    static FIELD_PATH: OnceLock<Regex> = OnceLock::new();
    FIELD_PATH.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("field path pattern compiles")
    })
}

/// A validated dot-separated document path such as `customer.address.city`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(String);

impl FieldPath {
    /// Validate a raw path
    pub fn parse(raw: &str) -> ValidationResult<Self> {
        if raw.is_empty() || raw.len() > MAX_FIELD_PATH_LEN || !field_path_regex().is_match(raw) {
            return Err(ValidationError::InvalidField(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments in order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Whether `self` equals `other` or is one of its ancestors
    pub fn covers(&self, other: &FieldPath) -> bool {
        other.0 == self.0
            || (other.0.len() > self.0.len()
                && other.0.starts_with(&self.0)
                && other.0.as_bytes()[self.0.len()] == b'.')
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optional field vocabulary keyed by document type
///
/// Types without a declared vocabulary accept every syntactically valid
/// path. A declared path also admits its descendants.
#[derive(Debug, Clone, Default)]
pub struct FieldAllowList {
    by_type: HashMap<String, Vec<FieldPath>>,
}

impl FieldAllowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the vocabulary for one document type
    pub fn declare(&mut self, doc_type: &str, paths: &[String]) -> ValidationResult<()> {
        let parsed = paths
            .iter()
            .map(|p| FieldPath::parse(p))
            .collect::<ValidationResult<Vec<_>>>()?;
        self.by_type.insert(doc_type.to_string(), parsed);
        Ok(())
    }

    pub fn has_vocabulary(&self, doc_type: &str) -> bool {
        self.by_type.contains_key(doc_type)
    }

    /// Check one path against the type's vocabulary
    pub fn check(&self, doc_type: &str, path: &FieldPath) -> ValidationResult<()> {
        match self.by_type.get(doc_type) {
            None => Ok(()),
            Some(allowed) if allowed.iter().any(|a| a.covers(path)) => Ok(()),
            Some(_) => Err(ValidationError::FieldNotAllowed {
                doc_type: doc_type.to_string(),
                field: path.to_string(),
            }),
        }
    }

    /// Parse a path and check it against the vocabulary
    pub fn resolve(&self, doc_type: &str, raw: &str) -> ValidationResult<FieldPath> {
        let path = FieldPath::parse(raw)?;
        self.check(doc_type, &path)?;
        Ok(path)
    }
}
