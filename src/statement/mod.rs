//! # Statement Builder
//!
//! Parameterized SELECT/COUNT generation over the document table
//! `data(id TEXT, ref TEXT, sid TEXT, document JSONB)`.

mod binder;
mod builder;
mod path;

pub use binder::Binder;
pub use builder::{RetrievalPath, Statement, StatementBuilder, StatementPlan};
pub use path::{escape_like, is_identifier, json_path, text_path};
