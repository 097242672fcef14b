//! # Error Handling
//!
//! This module provides unified error handling for the facility operations API,
//! implementing a consistent problem+json response format with trace ID propagation.

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::spatial::mutation::MutationError;
use crate::store::StoreError;
use crate::telemetry;

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Error of a standard kind, carrying that kind's status and code
    pub fn of(kind: ErrorType, message: impl Into<String>) -> Self {
        Self::new(kind.status_code(), kind.error_code(), message)
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Trace ID of the current request, or a short correlation ID outside one
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                Some(format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

/// Standard error types with predefined status codes
#[derive(Debug, Error)]
pub enum ErrorType {
    #[error("Bad Request")]
    BadRequest,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Not Found")]
    NotFound,
    #[error("Conflict")]
    Conflict,
    #[error("Internal Server Error")]
    InternalServerError,
    #[error("Service Unavailable")]
    ServiceUnavailable,
}

impl ErrorType {
    /// Get the appropriate HTTP status code for this error type
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorType::BadRequest => StatusCode::BAD_REQUEST,
            ErrorType::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorType::Forbidden => StatusCode::FORBIDDEN,
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::Conflict => StatusCode::CONFLICT,
            ErrorType::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorType::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error code string for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorType::BadRequest => "VALIDATION_FAILED",
            ErrorType::Unauthorized => "UNAUTHORIZED",
            ErrorType::Forbidden => "FORBIDDEN",
            ErrorType::NotFound => "NOT_FOUND",
            ErrorType::Conflict => "CONFLICT",
            ErrorType::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorType::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        (self.status, headers, axum::Json(self)).into_response()
    }
}

// Error mappers for common sources

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);

        Self::of(ErrorType::InternalServerError, "An internal error occurred")
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::of(ErrorType::BadRequest, message)
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        match error {
            sea_orm::DbErr::RecordNotFound(record) => {
                Self::of(ErrorType::NotFound, format!("Record not found: {}", record))
            }
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::of(ErrorType::ServiceUnavailable, "Database service unavailable")
            }
            _ => {
                tracing::error!("Database error: {:?}", error);
                Self::of(ErrorType::InternalServerError, "Database error occurred")
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { .. } => Self::of(ErrorType::NotFound, error.to_string()),
            StoreError::AlreadyExists { .. } => Self::of(ErrorType::Conflict, error.to_string()),
            StoreError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<MutationError> for ApiError {
    fn from(error: MutationError) -> Self {
        match error {
            MutationError::Validation(_) | MutationError::Rejected(_) => {
                Self::of(ErrorType::BadRequest, error.to_string())
            }
            MutationError::ReadOnly { target } => Self::of(ErrorType::Forbidden, error.to_string())
                .with_details(json!({ "target": target })),
            MutationError::NotFound { target, ref id } => {
                let details = json!({ "target": target, "id": id });
                Self::of(ErrorType::NotFound, error.to_string()).with_details(details)
            }
            MutationError::Storage(store_err) => store_err.into(),
        }
    }
}

/// Create an unauthorized error (401)
pub fn unauthorized(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    ApiError::of(ErrorType::Unauthorized, msg)
}

/// Create a validation error with field details
pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::of(ErrorType::BadRequest, message).with_details(field_errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::spatial::SpatialLevel;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_api_error_basic() {
        let error = ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Test error message",
        );

        assert_eq!(error.code, Box::from("VALIDATION_FAILED"));
        assert_eq!(error.message, Box::from("Test error message"));
        assert_eq!(error.details, None);
    }

    #[test]
    fn test_error_type_mapping() {
        let not_found_error = ApiError::of(ErrorType::NotFound, "No such site");
        assert_eq!(not_found_error.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found_error.code, Box::from("NOT_FOUND"));
        assert_eq!(not_found_error.message, Box::from("No such site"));

        let unavailable = ApiError::of(ErrorType::ServiceUnavailable, "Database unreachable");
        assert_eq!(unavailable.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(unavailable.code, Box::from("SERVICE_UNAVAILABLE"));
    }

    #[test]
    fn test_from_anyhow() {
        let api_error: ApiError = anyhow::anyhow!("Something went wrong").into();

        assert_eq!(api_error.code, Box::from("INTERNAL_SERVER_ERROR"));
        assert_eq!(api_error.message, Box::from("An internal error occurred"));
    }

    #[test]
    fn test_content_type_header() {
        let response =
            ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", "Test error").into_response();

        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn test_trace_id_fallback_format() {
        let error = ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "Test error",
        );

        let trace_id = error.trace_id.unwrap();
        assert!(trace_id.starts_with("corr-"));
        assert_eq!(trace_id.len(), 13);
    }

    #[test]
    fn test_database_error_mapping() {
        let api_error: ApiError = sea_orm::DbErr::RecordNotFound("test_record".to_string()).into();

        assert_eq!(api_error.status, StatusCode::NOT_FOUND);
        assert!(api_error.message.contains("test_record"));

        let conn_error: ApiError =
            sea_orm::DbErr::Conn(sea_orm::RuntimeErr::Internal("down".to_string())).into();
        assert_eq!(conn_error.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_mutation_error_mapping() {
        let validation: ApiError = MutationError::Validation("a zone must reference its parent".into()).into();
        assert_eq!(validation.status, StatusCode::BAD_REQUEST);
        assert_eq!(validation.message, Box::from("a zone must reference its parent"));

        let read_only: ApiError = MutationError::ReadOnly {
            target: SpatialLevel::City,
        }
        .into();
        assert_eq!(read_only.status, StatusCode::FORBIDDEN);
        assert_eq!(read_only.details, Some(Box::new(json!({"target": "city"}))));

        let missing: ApiError = MutationError::NotFound {
            target: SpatialLevel::Unit,
            id: "u1".to_string(),
        }
        .into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.code, Box::from("NOT_FOUND"));
    }

    #[test]
    fn test_store_error_mapping() {
        let conflict: ApiError = StoreError::AlreadyExists {
            collection: "sites".to_string(),
            id: "s1".to_string(),
        }
        .into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);
        assert_eq!(conflict.code, Box::from("CONFLICT"));
    }

    #[test]
    fn test_auth_error_helpers() {
        let auth_error = unauthorized(None);
        assert_eq!(auth_error.status, StatusCode::UNAUTHORIZED);
        assert_eq!(auth_error.code, Box::from("UNAUTHORIZED"));
        assert_eq!(auth_error.message, Box::from("Authentication required"));
    }

    #[test]
    fn test_validation_error_with_details() {
        let field_errors = json!({"month": "must be between 1 and 12"});
        let error = validation_error("Invalid report query", field_errors.clone());

        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert_eq!(error.code, Box::from("VALIDATION_FAILED"));
        assert_eq!(error.details, Some(Box::new(field_errors)));
    }
}
