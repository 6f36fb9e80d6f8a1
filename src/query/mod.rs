//! # Query Request Model
//!
//! Validation of inbound queries into [`DocumentQuery`] values. Nothing in
//! this module touches the store; every error is raised before a statement
//! is built.

mod errors;
mod field;
mod model;
mod request;
mod term;

pub use errors::{ValidationError, ValidationResult};
pub use field::{FieldAllowList, FieldPath, ID_FIELD, MAX_FIELD_PATH_LEN};
pub use model::{
    Aggregate, AggregateKind, DocumentQuery, FieldSelection, IdSelector, Page, Projection,
    QueryLimits, RetrievalKind, Search, SortKey, SortOrder, SortTarget, MAX_PAGE_LIMIT,
};
pub use request::{
    GroupInput, OneOrMany, PredicateInput, QueryRequest, SearchInput, SortInput, TermInput,
};
pub use term::{CompareAs, Operand, Predicate, Relation, Term, TermRelation};
