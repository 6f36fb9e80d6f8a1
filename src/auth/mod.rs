//! # Access Gate
//!
//! Bearer-token authentication for API callers. A token resolves to
//! exactly one active credential of the configured type; the credential
//! carries the tenant every query is scoped to.

pub mod credential;
pub mod crypto;
pub mod errors;
pub mod gate;

pub use credential::{
    AccessCredential, CredentialStore, InMemoryCredentialStore, Permission, TableCredentialStore,
};
pub use errors::{AuthError, AuthResult};
pub use gate::{AccessGate, AccessScope};
