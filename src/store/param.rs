//! # Bound Parameters
//!
//! Every requester-supplied value reaches the store as a `SqlParam`,
//! never as statement text.

use serde_json::Value;

/// A SQL parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Text parameter.
    Text(String),
    /// Integer parameter.
    Integer(i64),
    /// Floating point parameter.
    Float(f64),
    /// Boolean parameter.
    Bool(bool),
    /// JSON parameter (objects and arrays from plugin calls).
    Json(Value),
    /// Null parameter.
    Null,
}

impl SqlParam {
    /// Creates a text parameter.
    pub fn text(s: impl Into<String>) -> Self {
        SqlParam::Text(s.into())
    }

    /// Converts a plugin-supplied JSON value into a parameter.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => SqlParam::Null,
            Value::Bool(b) => SqlParam::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlParam::Integer(i),
                None => SqlParam::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => SqlParam::Text(s.clone()),
            other => SqlParam::Json(other.clone()),
        }
    }

    /// Renders the value for plan output.
    pub fn to_json(&self) -> Value {
        match self {
            SqlParam::Text(s) => Value::String(s.clone()),
            SqlParam::Integer(i) => Value::from(*i),
            SqlParam::Float(f) => Value::from(*f),
            SqlParam::Bool(b) => Value::Bool(*b),
            SqlParam::Json(v) => v.clone(),
            SqlParam::Null => Value::Null,
        }
    }

    /// Returns the text payload, if this is a text parameter.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlParam::Text(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(SqlParam::from_json(&json!("abc")), SqlParam::text("abc"));
        assert_eq!(SqlParam::from_json(&json!(42)), SqlParam::Integer(42));
        assert_eq!(SqlParam::from_json(&json!(1.5)), SqlParam::Float(1.5));
        assert_eq!(SqlParam::from_json(&json!(true)), SqlParam::Bool(true));
        assert_eq!(SqlParam::from_json(&json!(null)), SqlParam::Null);
    }

    #[test]
    fn test_from_json_structured() {
        let value = json!({"a": [1, 2]});
        assert_eq!(SqlParam::from_json(&value), SqlParam::Json(value.clone()));
        assert_eq!(SqlParam::Json(value.clone()).to_json(), value);
    }
}
