//! HTTP API
//!
//! - `GET  /health`
//! - `GET  /api/menu`
//! - `POST /api/auth/telegram`
//! - `POST /api/order`
//! - `POST /api/redeem`
//! - `POST /api/admin/accrue`, `POST /api/admin/sweep` (bearer)
//! - `POST /webhook`, `POST /tg/webhook` (Bot API updates, secret token)

pub mod admin;
pub mod auth;
pub mod health;
pub mod menu;
pub mod order;
pub mod redeem;
pub mod webhook;

use axum::routing::{get, post};
use axum::{Router, middleware};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::{admin_auth_middleware, webhook_secret_middleware};
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Default)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// CORS restricted to the configured origin; preflight is answered here
///
/// Foreign origins get no `Access-Control-Allow-Origin` at all.
fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |request_origin: &HeaderValue, _: &http::request::Parts| *request_origin == origin,
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}

/// Build the full application with middleware and state
pub fn build_app(state: AppState) -> Router {
    let admin = Router::new()
        .route("/api/admin/accrue", post(admin::accrue))
        .route("/api/admin/sweep", post(admin::sweep))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/menu", get(menu::get_menu))
        .route("/api/auth/telegram", post(auth::telegram_auth))
        .route("/api/order", post(order::create_order))
        .route("/api/redeem", post(redeem::redeem));

    let bot = Router::new()
        .route("/webhook", post(webhook::handle_update))
        .route("/tg/webhook", post(webhook::handle_update))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            webhook_secret_middleware,
        ));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(public)
        .merge(bot)
        .merge(admin)
        .layer(cors_layer(state.config.cors_origin.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, XRequestId))
        .with_state(state)
}
