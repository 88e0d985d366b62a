//! POST /api/order
//!
//! Checks run cheapest first: request shape, then the init data
//! signature, then the menu. Prices always come from the menu snapshot.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::error::{AppError, ErrorCode};
use shared::models::{ETA_OPTIONS, PaymentMethod, TableNumber};

use crate::error::ServiceResult;
use crate::ledger::OrderDraft;
use crate::pricing::{MAX_QUANTITY, RequestedItem, price_order};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    #[serde(rename = "initData")]
    pub init_data: Option<String>,
    pub items: Option<Vec<RequestedItem>>,
    pub eta_minutes: Option<i64>,
    pub table_number: Option<Value>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub ok: bool,
    pub order_id: String,
    pub short_id: String,
    pub due_at: DateTime<Utc>,
    pub eta_minutes: i32,
    pub total_amount: i64,
    pub stars_added: i64,
    pub new_stars: i64,
}

struct ValidRequest {
    init_data: String,
    items: Vec<RequestedItem>,
    eta_minutes: i32,
    table_number: TableNumber,
    payment_method: PaymentMethod,
}

fn validate(req: OrderRequest) -> Result<ValidRequest, AppError> {
    let (Some(init_data), Some(items), Some(eta), Some(table), Some(payment)) = (
        req.init_data.filter(|s| !s.is_empty()),
        req.items.filter(|items| !items.is_empty()),
        req.eta_minutes,
        req.table_number,
        req.payment_method,
    ) else {
        return Err(AppError::required_fields());
    };

    let eta_minutes = i32::try_from(eta)
        .ok()
        .filter(|m| ETA_OPTIONS.contains(m))
        .ok_or_else(|| AppError::new(ErrorCode::InvalidEta))?;
    let table_number =
        TableNumber::from_json(&table).ok_or_else(|| AppError::new(ErrorCode::InvalidTable))?;
    let payment_method = PaymentMethod::from_db(&payment)
        .ok_or_else(|| AppError::new(ErrorCode::PaymentInvalidMethod))?;

    if items.iter().any(|i| i.qty > MAX_QUANTITY) {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!("Quantity must not exceed {MAX_QUANTITY}"),
        ));
    }

    Ok(ValidRequest {
        init_data,
        items,
        eta_minutes,
        table_number,
        payment_method,
    })
}

pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> ServiceResult<Json<OrderResponse>> {
    let Json(req) = payload.map_err(AppError::from)?;
    let req = validate(req)?;

    let tg_user = state.verifier.authenticate(&req.init_data)?;

    let menu = state.menu.get().await.map_err(|e| {
        tracing::warn!(error = %e, "Menu unavailable, refusing order");
        AppError::new(ErrorCode::MenuUnavailable)
    })?;

    let priced = price_order(&req.items, &menu);
    if priced.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty).into());
    }

    let placed = state
        .ledger
        .place_order(
            &tg_user,
            OrderDraft {
                priced,
                eta_minutes: req.eta_minutes,
                table_number: req.table_number,
                payment_method: req.payment_method,
            },
        )
        .await?;

    state.orders.notify_new_order(&placed).await;

    let order = &placed.order;
    Ok(Json(OrderResponse {
        ok: true,
        order_id: order.id.clone(),
        short_id: order.short_id.clone(),
        due_at: order.due_at,
        eta_minutes: order.eta_minutes,
        total_amount: order.total_amount,
        stars_added: order.stars_added,
        new_stars: placed.user.stars,
    }))
}
