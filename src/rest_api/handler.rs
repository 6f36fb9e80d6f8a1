//! Request handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use crate::executor::QueryOutcome;
use crate::query::QueryRequest;

use super::errors::ApiResult;
use super::response::{ApiResponse, HealthResponse};
use super::server::ApiState;

/// `POST /api/v1/query`
///
/// The credential is checked before the body is looked at, so an
/// unauthenticated caller learns nothing about request validity.
pub async fn query_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<QueryOutcome>>> {
    let scope = state.gate.authorize(&headers).await?;
    let Json(request) = body?;

    let outcome = state.executor.execute(&request, &scope.tenant_id).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// `GET /health`
pub async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        store_connected: state.executor.connection().is_connected(),
    };

    (StatusCode::OK, Json(response))
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<ApiState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.metrics.to_json()))
}
