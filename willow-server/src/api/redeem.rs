//! POST /api/redeem

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use serde_json::{Value, json};
use shared::error::AppError;

use crate::error::ServiceResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub telegram_id: Option<i64>,
    #[serde(rename = "rewardKey")]
    pub reward_key: Option<String>,
}

pub async fn redeem(
    State(state): State<AppState>,
    payload: Result<Json<RedeemRequest>, JsonRejection>,
) -> ServiceResult<Json<Value>> {
    let Json(req) = payload.map_err(AppError::from)?;
    let (Some(telegram_id), Some(reward_key)) =
        (req.telegram_id, req.reward_key.filter(|k| !k.is_empty()))
    else {
        return Err(AppError::required_fields().into());
    };

    let (user, _reward) = state.ledger.redeem(telegram_id, &reward_key).await?;
    Ok(Json(json!({ "ok": true, "new_total": user.stars })))
}
