//! # Operator Authentication
//!
//! Bearer-token guard for mutating endpoints. Tokens come from
//! `FACILITY_OPERATOR_TOKENS` and are compared in constant time.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::config::AppConfig;
use crate::error::{ApiError, unauthorized};
use crate::server::AppState;

/// Marker for requests that passed [`auth_middleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorAuth;

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

/// Rejects requests without a configured operator bearer token.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;
    validate_token(&config, token)?;

    tracing::debug!(path = %request.uri().path(), "Authenticated operator request");
    request.extensions_mut().insert(OperatorAuth);

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
}

fn validate_token(config: &AppConfig, token: &str) -> Result<(), ApiError> {
    if config.operator_tokens.is_empty() {
        tracing::warn!("Operator request rejected: no operator tokens configured");
        return Err(unauthorized(Some("Operator access is not configured")));
    }

    let is_valid = config
        .operator_tokens
        .iter()
        .any(|configured| bool::from(token.as_bytes().ct_eq(configured.as_bytes())));

    if is_valid {
        Ok(())
    } else {
        Err(unauthorized(Some("Invalid bearer token")))
    }
}

impl<S> FromRequestParts<S> for OperatorAuth
where
    Arc<AppConfig>: FromRef<S>,
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OperatorAuth>()
            .copied()
            .ok_or_else(|| unauthorized(Some("Operator authentication required")))
    }
}
