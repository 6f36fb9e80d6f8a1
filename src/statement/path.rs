//! Document path expressions
//!
//! Field paths are validated identifiers joined by dots, so their segments
//! can be written into a Postgres text-array literal without quoting.

use std::sync::OnceLock;

use regex::Regex;

use crate::query::FieldPath;

/// Longest identifier Postgres keeps without truncation
const MAX_IDENTIFIER_LEN: usize = 63;

fn identifier_regex() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern compiles"))
}

/// Whether `name` can be used unquoted as a table name
pub fn is_identifier(name: &str) -> bool {
    name.len() <= MAX_IDENTIFIER_LEN && identifier_regex().is_match(name)
}

fn path_literal(field: &FieldPath) -> String {
    format!("'{{{}}}'", field.segments().collect::<Vec<_>>().join(","))
}

/// `document #> '{a,b}'`: the value as jsonb
pub fn json_path(field: &FieldPath) -> String {
    format!("document #> {}", path_literal(field))
}

/// `document #>> '{a,b}'`: the value as text
pub fn text_path(field: &FieldPath) -> String {
    format!("document #>> {}", path_literal(field))
}

/// Quoted column alias
pub fn alias(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape `LIKE` metacharacters so the needle matches literally
pub fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
