//! Bot API webhook secret
//!
//! Telegram echoes the `secret_token` given to `setWebhook` in the
//! `X-Telegram-Bot-Api-Secret-Token` header of every update. Requests
//! without it never reach the update handler.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::error::AppError;

use crate::state::AppState;

pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Middleware that rejects updates not carrying the configured secret
pub async fn webhook_secret_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let secret = state.config.webhook_secret.as_str();
    let authorized = !secret.is_empty()
        && request
            .headers()
            .get(SECRET_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|token| token == secret);

    if !authorized {
        tracing::warn!(path = %request.uri().path(), "Rejected webhook update without secret token");
        return Err(AppError::unauthorized());
    }

    Ok(next.run(request).await)
}
