//! tenantql - multi-tenant document queries over a single JSONB table
//!
//! A request is authenticated to a tenant, validated into a typed query,
//! compiled to parameterized SQL scoped to `(type, tenant)` and shaped
//! back into JSON. Plugins get a pattern-gated raw SQL capability on the
//! same connection.

pub mod auth;
pub mod cli;
pub mod config;
pub mod executor;
pub mod gate;
pub mod observability;
pub mod query;
pub mod rest_api;
pub mod service;
pub mod statement;
pub mod store;
