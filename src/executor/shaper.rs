//! Row formatting
//!
//! Projected columns arrive as JSON text. The shaper turns each row back
//! into a document keyed by field path, with aggregate columns as numbers.

use serde_json::{Map, Number, Value};

use crate::query::{DocumentQuery, FieldSelection, Projection, ID_FIELD};
use crate::store::StoreRow;

/// Column carrying the serialized document for `fields: "*"`
const DOCUMENT_COLUMN: &str = "document";

/// Formats store rows for one query
pub struct ResultShaper<'a> {
    query: &'a DocumentQuery,
}

impl<'a> ResultShaper<'a> {
    pub fn new(query: &'a DocumentQuery) -> Self {
        Self { query }
    }

    pub fn shape_all(&self, rows: &[StoreRow]) -> Vec<Value> {
        rows.iter().map(|row| self.shape(row)).collect()
    }

    /// Format one row
    pub fn shape(&self, row: &StoreRow) -> Value {
        let mut out = Map::new();

        match &self.query.selection {
            FieldSelection::Wildcard => {
                if let Some(Value::Object(document)) = row.get(DOCUMENT_COLUMN).map(parse_serialized) {
                    out.extend(document);
                }
            }
            FieldSelection::Fields(projections) => {
                for projection in projections {
                    if let Projection::Path(field) = projection {
                        let value = row
                            .get(field.as_str())
                            .map(parse_serialized)
                            .unwrap_or(Value::Null);
                        out.insert(field.to_string(), value);
                    }
                }
            }
        }

        for aggregate in &self.query.aggregates {
            let alias = aggregate.alias();
            let value = row.get(&alias).map(to_number).unwrap_or_else(|| Value::from(0));
            out.insert(alias, value);
        }

        if let Some(id) = row.get(ID_FIELD).filter(|v| !v.is_null()) {
            out.entry(ID_FIELD.to_string()).or_insert_with(|| id.clone());
        }

        Value::Object(out)
    }
}

/// Re-parse JSON text; values that are not JSON text pass through
fn parse_serialized(value: &Value) -> Value {
    match value {
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

/// Aggregate column to a number; unparseable input becomes 0
fn to_number(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Value::from(i)
            } else {
                s.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::from(0))
            }
        }
        _ => Value::from(0),
    }
}

/// Parse the `total` column of a count statement
pub fn total_records(rows: &[StoreRow]) -> i64 {
    rows.first()
        .and_then(|row| row.get("total"))
        .map(to_number)
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FieldAllowList, QueryLimits, QueryRequest};
    use serde_json::json;

    fn query(body: Value) -> DocumentQuery {
        serde_json::from_value::<QueryRequest>(body)
            .unwrap()
            .validate(&FieldAllowList::new(), &QueryLimits::default())
            .unwrap()
    }

    fn row(value: Value) -> StoreRow {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_explicit_fields() {
        let q = query(json!({"key": "orders", "fields": ["status", "customer.name", "missing"]}));
        let shaped = ResultShaper::new(&q).shape(&row(json!({
            "_id": "abcdefghijkl",
            "status": "\"open\"",
            "customer.name": "\"Acme\"",
            "missing": null
        })));
        assert_eq!(
            shaped,
            json!({
                "_id": "abcdefghijkl",
                "status": "open",
                "customer.name": "Acme",
                "missing": null
            })
        );
    }

    #[test]
    fn test_nested_values_are_parsed() {
        let q = query(json!({"key": "orders", "fields": ["items", "total"]}));
        let shaped = ResultShaper::new(&q).shape(&row(json!({
            "_id": "abcdefghijkl",
            "items": "[{\"sku\": \"a\"}]",
            "total": "12.5"
        })));
        assert_eq!(shaped["items"], json!([{"sku": "a"}]));
        assert_eq!(shaped["total"], json!(12.5));
    }

    #[test]
    fn test_wildcard_expands_document() {
        let q = query(json!({"key": "orders", "fields": "*"}));
        let shaped = ResultShaper::new(&q).shape(&row(json!({
            "_id": "abcdefghijkl",
            "document": "{\"status\": \"open\", \"total\": 3}"
        })));
        assert_eq!(
            shaped,
            json!({"_id": "abcdefghijkl", "status": "open", "total": 3})
        );
    }

    #[test]
    fn test_wildcard_id_not_overwritten() {
        let q = query(json!({"key": "orders", "fields": "*"}));
        let shaped = ResultShaper::new(&q).shape(&row(json!({
            "_id": "abcdefghijkl",
            "document": "{\"_id\": \"embedded\"}"
        })));
        assert_eq!(shaped["_id"], "embedded");
    }

    #[test]
    fn test_aggregates_become_numbers() {
        let q = query(json!({
            "key": "orders", "fields": ["region"], "groupby": "region",
            "sum": ["total"], "count": ["total"]
        }));
        let shaped = ResultShaper::new(&q).shape(&row(json!({
            "region": "\"EU\"",
            "total_sum": "60",
            "total_count": "3"
        })));
        assert_eq!(shaped, json!({"region": "EU", "total_sum": 60, "total_count": 3}));
    }

    #[test]
    fn test_unparseable_aggregate_is_zero() {
        let q = query(json!({"key": "orders", "sum": ["total"]}));
        let shaped = ResultShaper::new(&q).shape(&row(json!({"total_sum": "n/a"})));
        assert_eq!(shaped["total_sum"], json!(0));

        let shaped = ResultShaper::new(&q).shape(&row(json!({"total_sum": "10.5"})));
        assert_eq!(shaped["total_sum"], json!(10.5));
    }

    #[test]
    fn test_total_records() {
        assert_eq!(total_records(&[row(json!({"total": "42"}))]), 42);
        assert_eq!(total_records(&[]), 0);
    }
}
