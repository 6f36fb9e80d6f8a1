//! # Query Executor / Result Shaper
//!
//! Runs built statements on the shared connection and shapes rows into
//! caller-facing documents.
//!
//! - single id with `type:"get"`: one document, `{}` when absent
//! - id list, or one id with `type:"find"`: a bare list
//! - no ids: `{data, meta: {total_records, limit, offset}}`

mod errors;
mod executor;
mod result;
mod shaper;

pub use errors::{QueryError, QueryResult};
pub use executor::QueryExecutor;
pub use result::{PageData, PageMeta, QueryOutcome};
pub use shaper::ResultShaper;
