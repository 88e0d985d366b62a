//! POST /api/auth/telegram

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::User;

use crate::error::ServiceResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    #[serde(rename = "initData")]
    pub init_data: Option<String>,
}

/// Verify init data and return the caller's loyalty record, creating it on
/// first contact
pub async fn telegram_auth(
    State(state): State<AppState>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> ServiceResult<Json<User>> {
    let Json(req) = payload.map_err(AppError::from)?;
    let init_data = req
        .init_data
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::with_message(ErrorCode::RequiredField, "initData is required"))?;

    let tg_user = state.verifier.authenticate(&init_data)?;
    let user = state.ledger.get_or_create_user(&tg_user).await?;
    Ok(Json(user))
}
