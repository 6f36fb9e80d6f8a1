//! Filter terms
//!
//! A term arrives in one of three shapes and is normalized into [`Term`].
//! Relation operators come from a closed vocabulary so the statement
//! builder never copies caller text into SQL.

use serde_json::Value;

use super::errors::{ValidationError, ValidationResult};
use super::field::FieldPath;

/// Comparison relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    In,
    Is,
}

impl Relation {
    /// Parse a relation token; symbolic and word forms are both accepted
    pub fn parse(raw: &str) -> ValidationResult<Self> {
        let relation = match raw.trim().to_ascii_lowercase().as_str() {
            "=" | "eq" => Relation::Eq,
            "!=" | "<>" | "neq" => Relation::Neq,
            ">" | "gt" => Relation::Gt,
            ">=" | "gte" => Relation::Gte,
            "<" | "lt" => Relation::Lt,
            "<=" | "lte" => Relation::Lte,
            "like" => Relation::Like,
            "ilike" => Relation::ILike,
            "in" => Relation::In,
            "is" => Relation::Is,
            _ => return Err(ValidationError::InvalidRelation(raw.to_string())),
        };
        Ok(relation)
    }

    /// SQL operator text
    pub fn sql_operator(&self) -> &'static str {
        match self {
            Relation::Eq => "=",
            Relation::Neq => "<>",
            Relation::Gt => ">",
            Relation::Gte => ">=",
            Relation::Lt => "<",
            Relation::Lte => "<=",
            Relation::Like => "LIKE",
            Relation::ILike => "ILIKE",
            Relation::In => "IN",
            Relation::Is => "IS",
        }
    }

    fn is_pattern(&self) -> bool {
        matches!(self, Relation::Like | Relation::ILike)
    }
}

/// How the document value is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareAs {
    #[default]
    Text,
    Numeric,
}

impl CompareAs {
    /// `"numeric"` selects numeric comparison, anything else is text
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint {
            Some(h) if h.eq_ignore_ascii_case("numeric") => CompareAs::Numeric,
            _ => CompareAs::Text,
        }
    }
}

/// How multiple predicates combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TermRelation {
    #[default]
    And,
    Or,
}

impl TermRelation {
    pub fn parse(raw: Option<&str>) -> ValidationResult<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(TermRelation::And),
            Some(r) if r.eq_ignore_ascii_case("and") => Ok(TermRelation::And),
            Some(r) if r.eq_ignore_ascii_case("or") => Ok(TermRelation::Or),
            Some(r) => Err(ValidationError::InvalidTermRelation(r.to_string())),
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            TermRelation::And => "AND",
            TermRelation::Or => "OR",
        }
    }
}

/// Right-hand side of a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// One scalar rendered as text
    Scalar(String),
    /// Values for `IN`
    List(Vec<String>),
    /// `IS NULL`
    Null,
    /// `IS NOT NULL`
    NotNull,
}

/// One validated comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: FieldPath,
    pub relation: Relation,
    pub operand: Operand,
    pub compare_as: CompareAs,
}

impl Predicate {
    /// Validate the value shape against the relation
    pub fn new(
        field: FieldPath,
        relation: Relation,
        value: &Value,
        compare_as: CompareAs,
    ) -> ValidationResult<Self> {
        if compare_as == CompareAs::Numeric && (relation.is_pattern() || relation == Relation::Is) {
            return Err(ValidationError::InvalidTerm(format!(
                "numeric comparison does not support '{}'",
                relation.sql_operator()
            )));
        }

        let operand = match relation {
            Relation::Is => {
                if value.is_null() {
                    Operand::Null
                } else {
                    Operand::NotNull
                }
            }
            Relation::In => {
                let items = value.as_array().ok_or_else(|| {
                    ValidationError::InvalidTerm(format!("'in' on '{}' requires a list", field))
                })?;
                if items.is_empty() {
                    return Err(ValidationError::InvalidTerm(format!(
                        "'in' on '{}' requires at least one value",
                        field
                    )));
                }
                let values = items
                    .iter()
                    .map(|v| scalar_text(&field, v, compare_as))
                    .collect::<ValidationResult<Vec<_>>>()?;
                Operand::List(values)
            }
            _ => Operand::Scalar(scalar_text(&field, value, compare_as)?),
        };

        Ok(Self {
            field,
            relation,
            operand,
            compare_as,
        })
    }

    /// Text equality, as produced by the compact string form
    pub fn text_eq(field: FieldPath, value: &str) -> Self {
        Self {
            field,
            relation: Relation::Eq,
            operand: Operand::Scalar(value.to_string()),
            compare_as: CompareAs::Text,
        }
    }
}

fn scalar_text(field: &FieldPath, value: &Value, compare_as: CompareAs) -> ValidationResult<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => {
            return Err(ValidationError::InvalidTerm(format!(
                "null value on '{}' requires relation 'is'",
                field
            )))
        }
        Value::Array(_) | Value::Object(_) => {
            return Err(ValidationError::InvalidTerm(format!(
                "value on '{}' must be a scalar",
                field
            )))
        }
    };

    if compare_as == CompareAs::Numeric && text.trim().parse::<f64>().is_err() {
        return Err(ValidationError::InvalidTerm(format!(
            "numeric comparison on '{}' requires a number, got '{}'",
            field, text
        )));
    }

    Ok(text)
}

/// Normalized filter
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// `a=1=b=2`: AND-ed text equalities
    StringTermPairs(Vec<Predicate>),
    SinglePredicate(Predicate),
    PredicateList {
        relation: TermRelation,
        predicates: Vec<Predicate>,
    },
}

impl Term {
    /// Predicates paired with the connective joining them
    pub fn parts(&self) -> (TermRelation, &[Predicate]) {
        match self {
            Term::StringTermPairs(predicates) => (TermRelation::And, predicates),
            Term::SinglePredicate(predicate) => (TermRelation::And, std::slice::from_ref(predicate)),
            Term::PredicateList {
                relation,
                predicates,
            } => (*relation, predicates),
        }
    }

    /// Split the compact `field=value=field=value` form into raw pairs
    ///
    /// A value containing `=` shifts every following segment; that input is
    /// not representable in this form.
    pub fn split_pairs(raw: &str) -> ValidationResult<Vec<(&str, &str)>> {
        let segments: Vec<&str> = raw.split('=').collect();
        if segments.len() % 2 != 0 {
            return Err(ValidationError::InvalidTerm(format!(
                "expected field=value pairs, got {} segments",
                segments.len()
            )));
        }
        Ok(segments
            .chunks(2)
            .map(|pair| (pair[0].trim(), pair[1]))
            .collect())
    }
}
