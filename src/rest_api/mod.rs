//! # REST API
//!
//! JSON over HTTP: one authenticated query endpoint plus unauthenticated
//! health and metrics.

pub mod config;
pub mod errors;
pub mod handler;
pub mod response;
pub mod server;

pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use response::{ApiResponse, HealthResponse};
pub use server::{ApiServer, ApiState};
