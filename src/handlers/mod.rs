//! # API Handlers
//!
//! HTTP endpoints of the facility operations API.

pub mod reports;
pub mod spatial;

use axum::{extract::State, response::Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db;
use crate::error::{ApiError, ErrorType};
use crate::models::ServiceInfo;
use crate::server::AppState;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Health status of the service and its database
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

/// Liveness probe that also pings the database
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database are healthy", body = HealthResponse, example = json!({
            "status": "ok",
            "database": "ok"
        })),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    db::health_check(&state.db).await.map_err(|err| {
        tracing::error!(error = %err, "Health check failed");
        ApiError::of(ErrorType::ServiceUnavailable, "Database service unavailable")
    })?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        database: "ok".to_string(),
    }))
}
