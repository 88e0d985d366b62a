//! GET /api/menu

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::HeaderValue;
use http::header::CACHE_CONTROL;
use shared::error::{AppError, ErrorCode};

use crate::state::AppState;

pub async fn get_menu(State(state): State<AppState>) -> Result<Response, AppError> {
    let snapshot = state.menu.get().await.map_err(|e| {
        tracing::error!(error = %e, "Menu unavailable and nothing cached");
        AppError::new(ErrorCode::MenuFetchFailed)
    })?;

    let cache_control = format!("public, max-age={}", state.menu.ttl_secs());
    let mut response = Json(&*snapshot).into_response();
    if let Ok(value) = HeaderValue::from_str(&cache_control) {
        response.headers_mut().insert(CACHE_CONTROL, value);
    }
    Ok(response)
}
