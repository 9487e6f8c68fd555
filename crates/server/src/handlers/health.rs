//! Health check endpoint.

use crate::handlers::common::format_timestamp;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use time::OffsetDateTime;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// GET /v1/health - Health check.
///
/// Intentionally unauthenticated for load balancer and orchestrator probes.
/// Returns 503 when the database is unreachable.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let timestamp = format_timestamp(OffsetDateTime::now_utc()).unwrap_or_default();

    match state.store.health_check().await {
        Ok(()) => Json(HealthResponse {
            status: "healthy",
            database: "connected",
            version: env!("CARGO_PKG_VERSION"),
            timestamp,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    database: "disconnected",
                    version: env!("CARGO_PKG_VERSION"),
                    timestamp,
                }),
            )
                .into_response()
        }
    }
}
