//! Success envelope

use serde::Serialize;

/// `{success: true, response: ...}`
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub response: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(response: T) -> Self {
        Self {
            success: true,
            response,
        }
    }
}

/// Health check body
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub store_connected: bool,
}
