//! # Query Request
//!
//! Wire shape of an inbound query and its validation into a
//! [`DocumentQuery`]. Several members accept either one value or a list;
//! `term` accepts a compact string, one predicate object, or a list.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::errors::{ValidationError, ValidationResult};
use super::field::{FieldAllowList, FieldPath, ID_FIELD};
use super::model::{
    Aggregate, AggregateKind, DocumentQuery, FieldSelection, IdSelector, Page, Projection,
    QueryLimits, RetrievalKind, Search, SortKey, SortOrder, SortTarget,
};
use super::term::{CompareAs, Predicate, Relation, Term, TermRelation};

const MIN_KEY_LEN: usize = 2;
const MAX_KEY_LEN: usize = 100;
const MIN_ID_LEN: usize = 12;

/// One value or a list of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Predicate object form of `term`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateInput {
    pub field: String,

    #[serde(default, alias = "op", alias = "operator")]
    pub relation: Option<String>,

    #[serde(default)]
    pub value: Value,

    /// `"numeric"` casts before comparing
    #[serde(default, rename = "type")]
    pub compare: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TermInput {
    Compact(String),
    Single(PredicateInput),
    List(Vec<PredicateInput>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchInput {
    #[serde(default)]
    pub field: Option<String>,

    #[serde(default)]
    pub s: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupInput {
    Name(String),
    Object { field: String },
}

impl GroupInput {
    fn field(&self) -> &str {
        match self {
            GroupInput::Name(f) | GroupInput::Object { field: f } => f,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortInput {
    Name(String),
    Object {
        field: String,
        #[serde(default)]
        order: Option<String>,
    },
}

/// Inbound query as sent by API callers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Document type; `ref` is accepted as an alias
    #[serde(default, alias = "ref")]
    pub key: Option<String>,

    #[serde(default)]
    pub id: Option<OneOrMany<String>>,

    /// Field list, or `"*"` for the whole document
    #[serde(default)]
    pub fields: Option<OneOrMany<String>>,

    #[serde(default)]
    pub term: Option<TermInput>,

    #[serde(default)]
    pub term_relation: Option<String>,

    #[serde(default)]
    pub search: Option<SearchInput>,

    #[serde(default)]
    pub groupby: Option<OneOrMany<GroupInput>>,

    #[serde(default)]
    pub sortby: Option<OneOrMany<SortInput>>,

    #[serde(default)]
    pub count: Option<OneOrMany<String>>,

    #[serde(default)]
    pub sum: Option<OneOrMany<String>>,

    #[serde(default, deserialize_with = "lenient_int")]
    pub limit: Option<i64>,

    #[serde(default, deserialize_with = "lenient_int")]
    pub offset: Option<i64>,

    /// `"get"` or `"find"`
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Accept integers, floats and numeric strings; anything else is absent
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

impl QueryRequest {
    /// Validate into a [`DocumentQuery`]
    ///
    /// Checks run in a fixed order: key, projection, ids, then field paths,
    /// terms, search, grouping and sorting.
    pub fn validate(
        &self,
        allow_list: &FieldAllowList,
        limits: &QueryLimits,
    ) -> ValidationResult<DocumentQuery> {
        let doc_type = self.validate_key()?;

        let fields = non_empty(self.fields.clone());
        let count = non_empty(self.count.clone());
        let sum = non_empty(self.sum.clone());
        if fields.is_empty() && count.is_empty() && sum.is_empty() {
            return Err(ValidationError::MissingProjection);
        }

        let ids = self.validate_ids()?;

        let field_of = |raw: &str| -> ValidationResult<FieldPath> {
            if raw == ID_FIELD {
                return Err(ValidationError::InvalidField(raw.to_string()));
            }
            allow_list.resolve(&doc_type, raw)
        };

        let selection = if fields.iter().any(|f| f.trim() == "*") {
            FieldSelection::Wildcard
        } else {
            let mut projections = Vec::with_capacity(fields.len());
            for raw in &fields {
                let projection = if raw == ID_FIELD {
                    Projection::Id
                } else {
                    Projection::Path(field_of(raw)?)
                };
                if !projections.contains(&projection) {
                    projections.push(projection);
                }
            }
            FieldSelection::Fields(projections)
        };

        let mut aggregates: Vec<Aggregate> = Vec::new();
        for raw in &count {
            push_unique(&mut aggregates, Aggregate::count(field_of(raw)?));
        }
        for raw in &sum {
            push_unique(&mut aggregates, Aggregate::sum(field_of(raw)?));
        }

        let term = self.validate_term(&field_of)?;
        let search = self.validate_search(&field_of)?;

        let mut group_by: Vec<FieldPath> = Vec::new();
        for group in self.groupby.clone().map(OneOrMany::into_vec).unwrap_or_default() {
            let path = field_of(group.field())?;
            if !group_by.contains(&path) {
                group_by.push(path);
            }
        }

        let sort = self.validate_sort(&aggregates, &field_of)?;

        let query = DocumentQuery {
            doc_type,
            ids,
            selection,
            aggregates,
            term,
            search,
            group_by,
            sort,
            page: Page::clamp(self.limit, self.offset, limits),
            kind: RetrievalKind::from_hint(self.kind.as_deref()),
        };

        check_aggregation(&query)?;
        Ok(query)
    }

    fn validate_key(&self) -> ValidationResult<String> {
        let key = self.key.as_deref().unwrap_or("");
        let len = key.chars().count();
        if !(MIN_KEY_LEN..=MAX_KEY_LEN).contains(&len) {
            return Err(ValidationError::KeyLength);
        }
        Ok(key.to_string())
    }

    fn validate_ids(&self) -> ValidationResult<Option<IdSelector>> {
        let selector = match &self.id {
            None => return Ok(None),
            Some(OneOrMany::One(id)) => IdSelector::Single(id.clone()),
            Some(OneOrMany::Many(ids)) => {
                if ids.is_empty() {
                    return Err(ValidationError::InvalidId("id list is empty".to_string()));
                }
                IdSelector::List(ids.clone())
            }
        };

        if let Some(short) = selector.ids().iter().find(|id| id.chars().count() < MIN_ID_LEN) {
            return Err(ValidationError::InvalidId(format!(
                "'{}' is shorter than {} characters",
                short, MIN_ID_LEN
            )));
        }
        Ok(Some(selector))
    }

    fn validate_term(
        &self,
        field_of: &impl Fn(&str) -> ValidationResult<FieldPath>,
    ) -> ValidationResult<Option<Term>> {
        let relation = TermRelation::parse(self.term_relation.as_deref())?;

        let term = match &self.term {
            None => None,
            Some(TermInput::Compact(raw)) if raw.trim().is_empty() => None,
            Some(TermInput::Compact(raw)) => {
                let predicates = Term::split_pairs(raw)?
                    .into_iter()
                    .map(|(field, value)| Ok(Predicate::text_eq(field_of(field)?, value)))
                    .collect::<ValidationResult<Vec<_>>>()?;
                Some(Term::StringTermPairs(predicates))
            }
            Some(TermInput::Single(input)) => Some(Term::SinglePredicate(predicate(input, field_of)?)),
            Some(TermInput::List(inputs)) if inputs.is_empty() => None,
            Some(TermInput::List(inputs)) => {
                let predicates = inputs
                    .iter()
                    .map(|input| predicate(input, field_of))
                    .collect::<ValidationResult<Vec<_>>>()?;
                Some(Term::PredicateList {
                    relation,
                    predicates,
                })
            }
        };
        Ok(term)
    }

    fn validate_search(
        &self,
        field_of: &impl Fn(&str) -> ValidationResult<FieldPath>,
    ) -> ValidationResult<Option<Search>> {
        let Some(input) = &self.search else {
            return Ok(None);
        };
        let needle = input.s.clone().unwrap_or_default();
        if needle.is_empty() {
            return Ok(None);
        }
        let field = match input.field.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(field_of(raw)?),
        };
        Ok(Some(Search { field, needle }))
    }

    fn validate_sort(
        &self,
        aggregates: &[Aggregate],
        field_of: &impl Fn(&str) -> ValidationResult<FieldPath>,
    ) -> ValidationResult<Vec<SortKey>> {
        let entries = self.sortby.clone().map(OneOrMany::into_vec).unwrap_or_default();
        let mut keys = Vec::with_capacity(entries.len());

        for entry in entries {
            let (field, order) = match entry {
                SortInput::Name(field) => (field, None),
                SortInput::Object { field, order } => (field, order),
            };

            let order = match order.as_deref().map(str::trim) {
                None | Some("") => SortOrder::Asc,
                Some(o) if o.eq_ignore_ascii_case("asc") => SortOrder::Asc,
                Some(o) if o.eq_ignore_ascii_case("desc") => SortOrder::Desc,
                Some(o) => return Err(ValidationError::InvalidSortOrder(o.to_string())),
            };

            let target = match resolve_aggregate(aggregates, &field) {
                Some(aggregate) => SortTarget::Aggregate(aggregate.clone()),
                None => SortTarget::Path(field_of(&field)?),
            };

            keys.push(SortKey { target, order });
        }
        Ok(keys)
    }
}

fn non_empty(input: Option<OneOrMany<String>>) -> Vec<String> {
    input
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect()
}

fn push_unique(aggregates: &mut Vec<Aggregate>, aggregate: Aggregate) {
    if !aggregates.contains(&aggregate) {
        aggregates.push(aggregate);
    }
}

fn predicate(
    input: &PredicateInput,
    field_of: &impl Fn(&str) -> ValidationResult<FieldPath>,
) -> ValidationResult<Predicate> {
    let field = field_of(&input.field)?;
    let relation = match input.relation.as_deref() {
        None => Relation::Eq,
        Some(raw) => Relation::parse(raw)?,
    };
    Predicate::new(
        field,
        relation,
        &input.value,
        CompareAs::from_hint(input.compare.as_deref()),
    )
}

/// Sort name lookup: exact alias first, then the bare field of a sum, then of a count
fn resolve_aggregate<'a>(aggregates: &'a [Aggregate], name: &str) -> Option<&'a Aggregate> {
    aggregates
        .iter()
        .find(|a| a.alias() == name)
        .or_else(|| {
            aggregates
                .iter()
                .find(|a| a.kind == AggregateKind::Sum && a.field.as_str() == name)
        })
        .or_else(|| {
            aggregates
                .iter()
                .find(|a| a.kind == AggregateKind::Count && a.field.as_str() == name)
        })
}

fn check_aggregation(query: &DocumentQuery) -> ValidationResult<()> {
    if !query.is_aggregating() {
        return Ok(());
    }

    match &query.selection {
        FieldSelection::Wildcard => {
            return Err(ValidationError::AggregationConflict(
                "'*' cannot be combined with aggregates or groupby".to_string(),
            ))
        }
        FieldSelection::Fields(projections) => {
            for projection in projections {
                match projection {
                    Projection::Id => {
                        return Err(ValidationError::AggregationConflict(
                            "'_id' cannot be combined with aggregates or groupby".to_string(),
                        ))
                    }
                    Projection::Path(path) if !query.group_by.contains(path) => {
                        return Err(ValidationError::AggregationConflict(format!(
                            "field '{}' must appear in groupby",
                            path
                        )))
                    }
                    Projection::Path(_) => {}
                }
            }
        }
    }

    for key in &query.sort {
        if let SortTarget::Path(path) = &key.target {
            if !query.group_by.contains(path) {
                return Err(ValidationError::AggregationConflict(format!(
                    "sort field '{}' must be grouped or an aggregate",
                    path
                )));
            }
        }
    }

    Ok(())
}
