//! Test harness: the full router over the in-memory store, a switchable
//! menu feed, a recording notifier and a manual clock.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use chrono::{TimeZone, Utc};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use willow_server::auth::init_data::{data_check_string, encode_fields, sign};
use willow_server::auth::webhook::SECRET_TOKEN_HEADER;
use willow_server::clock::ManualClock;
use willow_server::db::MemoryStore;
use willow_server::menu::{FeedError, MenuFeed};
use willow_server::telegram::RecordingNotifier;
use willow_server::{AppState, Config, api};

pub const ADMIN_CHAT: &str = "-1001";
pub const ADMIN_BEARER: &str = "s3cret";
pub const BOT_TOKEN: &str = "123:bot-token";
pub const WEBHOOK_SECRET: &str = "hook-secret";

pub const MENU_CSV: &str = "\
Категория,Английский,Русский,Сербский,Объем,Стоимость (RSD),Состав
Coffee,Flat White,Флэт уайт,Flet vajt,200ml,500,\"coffee, milk\"
Coffee,Espresso,Эспрессо,Espreso,30ml,200,coffee
";

/// Serves the CSV it holds, or fails when empty
#[derive(Default)]
pub struct SwitchFeed {
    csv: Mutex<Option<String>>,
}

impl SwitchFeed {
    pub fn set(&self, csv: Option<&str>) {
        *self.csv.lock().unwrap() = csv.map(String::from);
    }
}

#[async_trait]
impl MenuFeed for SwitchFeed {
    async fn fetch(&self) -> Result<String, FeedError> {
        self.csv
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| FeedError::Unavailable("feed down".into()))
    }
}

pub struct Harness {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
    pub feed: Arc<SwitchFeed>,
}

pub fn harness() -> Harness {
    let config = Config {
        bot_token: BOT_TOKEN.into(),
        admin_bearer: ADMIN_BEARER.into(),
        webhook_secret: WEBHOOK_SECRET.into(),
        admin_channel_id: Some(ADMIN_CHAT.into()),
        auth_test_mode: true,
        sweep_interval: None,
        ..Config::default()
    };
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
    ));
    let feed = Arc::new(SwitchFeed::default());
    feed.set(Some(MENU_CSV));

    let state = AppState::from_parts(
        config,
        store.clone(),
        feed.clone(),
        notifier.clone(),
        clock.clone(),
        None,
    );
    Harness {
        app: api::build_app(state.clone()),
        state,
        store,
        notifier,
        clock,
        feed,
    }
}

impl Harness {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        bearer: Option<&str>,
    ) -> (StatusCode, Value) {
        let (status, _, body) = self.raw(method, uri, body, bearer).await;
        (status, body)
    }

    /// Deliver a Bot API update the way Telegram does, secret token included
    pub async fn webhook(&self, uri: &str, update: Value) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(SECRET_TOKEN_HEADER, WEBHOOK_SECRET);
        let (status, _, body) = self.send(builder, Some(update)).await;
        (status, body)
    }

    pub async fn raw(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        bearer: Option<&str>,
    ) -> (StatusCode, http::HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder, body).await
    }

    async fn send(
        &self,
        builder: http::request::Builder,
        body: Option<Value>,
    ) -> (StatusCode, http::HeaderMap, Value) {
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, headers, body)
    }

    /// Id of the menu item with this English title
    pub async fn item_id(&self, title: &str) -> String {
        let menu = self.state.menu.get().await.unwrap();
        menu.items
            .iter()
            .find(|i| i.title.en == title)
            .map(|i| i.id.clone())
            .unwrap()
    }
}

/// Init data signed with the harness bot token
pub fn signed_init_data(user_json: &str) -> String {
    let mut fields = vec![
        ("auth_date".to_string(), "1714550400".to_string()),
        ("query_id".to_string(), "AAE-test".to_string()),
        ("user".to_string(), user_json.to_string()),
    ];
    let hash = sign(&data_check_string(&fields), BOT_TOKEN).unwrap();
    fields.push(("hash".to_string(), hash));
    encode_fields(&fields)
}
