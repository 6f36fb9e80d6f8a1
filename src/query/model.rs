//! Validated query model consumed by the statement builder

use super::field::FieldPath;
use super::term::Term;

/// Largest page a request may ask for
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Pagination bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: MAX_PAGE_LIMIT,
        }
    }
}

/// Clamped pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Clamp requested values; out-of-range input is never an error
    pub fn clamp(limit: Option<i64>, offset: Option<i64>, limits: &QueryLimits) -> Self {
        let max = limits.max_limit.max(1);
        Self {
            limit: limit.unwrap_or(limits.default_limit).clamp(1, max),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

/// Single-document (`get`) or list (`find`) retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrievalKind {
    Get,
    #[default]
    Find,
}

impl RetrievalKind {
    /// `"get"` (any case) selects single retrieval; everything else is find
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint {
            Some(h) if h.trim().eq_ignore_ascii_case("get") => RetrievalKind::Get,
            _ => RetrievalKind::Find,
        }
    }
}

/// Requested identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSelector {
    Single(String),
    List(Vec<String>),
}

impl IdSelector {
    pub fn ids(&self) -> &[String] {
        match self {
            IdSelector::Single(id) => std::slice::from_ref(id),
            IdSelector::List(ids) => ids,
        }
    }
}

/// One projected column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// The structural identifier, surfaced as `_id`
    Id,
    Path(FieldPath),
}

/// Projection requested by `fields`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    /// The whole document
    Wildcard,
    /// Explicit columns; empty when only aggregates were requested
    Fields(Vec<Projection>),
}

impl FieldSelection {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, FieldSelection::Wildcard)
    }

    pub fn projections(&self) -> &[Projection] {
        match self {
            FieldSelection::Wildcard => &[],
            FieldSelection::Fields(p) => p,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    Sum,
}

/// `COUNT`/`SUM` over one document path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub kind: AggregateKind,
    pub field: FieldPath,
}

impl Aggregate {
    pub fn count(field: FieldPath) -> Self {
        Self {
            kind: AggregateKind::Count,
            field,
        }
    }

    pub fn sum(field: FieldPath) -> Self {
        Self {
            kind: AggregateKind::Sum,
            field,
        }
    }

    /// Output column name: `<field>_count` or `<field>_sum`
    pub fn alias(&self) -> String {
        match self.kind {
            AggregateKind::Count => format!("{}_count", self.field),
            AggregateKind::Sum => format!("{}_sum", self.field),
        }
    }
}

/// Case-insensitive substring search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    /// `None` searches the whole serialized document
    pub field: Option<FieldPath>,
    pub needle: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortTarget {
    Path(FieldPath),
    Aggregate(Aggregate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub target: SortTarget,
    pub order: SortOrder,
}

/// A fully validated query
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    pub doc_type: String,
    pub ids: Option<IdSelector>,
    pub selection: FieldSelection,
    pub aggregates: Vec<Aggregate>,
    pub term: Option<Term>,
    pub search: Option<Search>,
    pub group_by: Vec<FieldPath>,
    pub sort: Vec<SortKey>,
    pub page: Page,
    pub kind: RetrievalKind,
}

impl DocumentQuery {
    /// Rows collapse into groups or aggregates
    pub fn is_aggregating(&self) -> bool {
        !self.aggregates.is_empty() || !self.group_by.is_empty()
    }

    /// Whether `id` is projected as `_id`
    pub fn includes_id(&self) -> bool {
        !self.is_aggregating()
    }
}
