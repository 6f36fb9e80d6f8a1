//! # Managed Raw-Query Gate
//!
//! Restricted SQL capability for plugin code: statements are checked
//! against a verb whitelist, a single permitted table and a forbidden
//! keyword list before they reach the shared connection.

pub mod context;
pub mod errors;
pub mod host;
pub mod validator;

pub use context::{PluginContext, RawQueryGate};
pub use errors::{HostError, HostResult, RawQueryError, RawQueryResult};
pub use host::{PluginHost, PluginRegistration};
pub use validator::RawQueryValidator;
