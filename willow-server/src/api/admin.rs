//! Admin endpoints (bearer authenticated)

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use serde_json::{Value, json};
use shared::error::{AppError, ErrorCode};

use crate::db::UserLookup;
use crate::error::ServiceResult;
use crate::ledger::AccrualGrant;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AccrueRequest {
    /// `card` | `username` | `telegram_id`
    pub by: Option<String>,
    /// String or number depending on `by`
    pub id: Option<Value>,
    pub amount: Option<i64>,
    pub stars: Option<i64>,
}

fn id_text(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_lookup(by: &str, id: &Value) -> Result<UserLookup, AppError> {
    let invalid_id = || AppError::validation("Invalid 'id' parameter");
    let id = id_text(id).filter(|s| !s.is_empty()).ok_or_else(invalid_id)?;
    match by {
        "card" => id.parse().map(UserLookup::Card).map_err(|_| invalid_id()),
        "telegram_id" => id.parse().map(UserLookup::TelegramId).map_err(|_| invalid_id()),
        "username" => {
            let name = id.trim_start_matches('@');
            if name.is_empty() {
                return Err(invalid_id());
            }
            Ok(UserLookup::Username(name.to_string()))
        }
        _ => Err(AppError::validation("Invalid 'by' parameter")),
    }
}

/// POST /api/admin/accrue
pub async fn accrue(
    State(state): State<AppState>,
    payload: Result<Json<AccrueRequest>, JsonRejection>,
) -> ServiceResult<Json<Value>> {
    let Json(req) = payload.map_err(AppError::from)?;
    let (Some(by), Some(id)) = (req.by, req.id) else {
        return Err(AppError::with_message(ErrorCode::RequiredField, "Missing params").into());
    };
    let grant = match (req.stars, req.amount) {
        (Some(stars), _) => AccrualGrant::Stars(stars),
        (None, Some(amount)) => AccrualGrant::Amount(amount),
        (None, None) => {
            return Err(AppError::with_message(ErrorCode::RequiredField, "Missing params").into());
        }
    };

    let lookup = parse_lookup(&by, &id)?;
    let user = state.ledger.admin_accrue(&lookup, grant).await?;
    Ok(Json(json!({ "ok": true, "user": user })))
}

/// POST /api/admin/sweep, for deployments driven by an external scheduler
pub async fn sweep(State(state): State<AppState>) -> ServiceResult<Json<Value>> {
    let swept = state.orders.sweep_overdue().await?;
    Ok(Json(json!({ "ok": true, "swept": swept.len() })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lookup() {
        assert_eq!(parse_lookup("card", &json!(1234)).unwrap(), UserLookup::Card(1234));
        assert_eq!(parse_lookup("card", &json!("1234")).unwrap(), UserLookup::Card(1234));
        assert_eq!(
            parse_lookup("username", &json!("@ana")).unwrap(),
            UserLookup::Username("ana".into())
        );
        assert_eq!(
            parse_lookup("telegram_id", &json!(42)).unwrap(),
            UserLookup::TelegramId(42)
        );
    }

    #[test]
    fn test_parse_lookup_rejects() {
        let err = parse_lookup("email", &json!("a@b.c")).unwrap_err();
        assert_eq!(err.message, "Invalid 'by' parameter");
        assert!(parse_lookup("card", &json!("abc")).is_err());
        assert!(parse_lookup("username", &json!("@")).is_err());
        assert!(parse_lookup("card", &json!(null)).is_err());
    }
}
