//! Static bearer authentication for admin endpoints

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::header::AUTHORIZATION;
use shared::error::AppError;

use crate::state::AppState;

/// Exact match against `Bearer <secret>`
pub fn bearer_matches(header: &str, secret: &str) -> bool {
    header
        .strip_prefix("Bearer ")
        .is_some_and(|token| !secret.is_empty() && token == secret)
}

/// Middleware that rejects requests without the admin bearer secret
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|h| bearer_matches(h, &state.config.admin_bearer));

    if !authorized {
        tracing::warn!(path = %request.uri().path(), "Rejected admin request");
        return Err(AppError::unauthorized());
    }

    Ok(next.run(request).await)
}
