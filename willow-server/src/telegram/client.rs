//! Outgoing Bot API calls
//!
//! Every send is best-effort: [`spawn_dispatch`] runs it off the request
//! path and only logs failures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

use super::types::InlineKeyboardMarkup;

const BOT_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Bot API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Bot API {method} rejected: {description}")]
    Api {
        method: &'static str,
        description: String,
    },
    #[error("could not encode Bot API payload: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendMessage {
    pub chat_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
}

impl SendMessage {
    pub fn new(chat_id: impl ToString, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.to_string(),
            text: text.into(),
            reply_markup: None,
            reply_to_message_id: None,
        }
    }

    pub fn with_markup(mut self, markup: InlineKeyboardMarkup) -> Self {
        self.reply_markup = Some(markup);
        self
    }

    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditMessageText {
    pub chat_id: String,
    pub message_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerCallbackQuery {
    pub callback_query_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A single Bot API method call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCall {
    SendMessage(SendMessage),
    EditMessageText(EditMessageText),
    AnswerCallbackQuery(AnswerCallbackQuery),
}

impl BotCall {
    pub fn method(&self) -> &'static str {
        match self {
            BotCall::SendMessage(_) => "sendMessage",
            BotCall::EditMessageText(_) => "editMessageText",
            BotCall::AnswerCallbackQuery(_) => "answerCallbackQuery",
        }
    }

    pub fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            BotCall::SendMessage(m) => serde_json::to_value(m),
            BotCall::EditMessageText(m) => serde_json::to_value(m),
            BotCall::AnswerCallbackQuery(m) => serde_json::to_value(m),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            BotCall::SendMessage(m) => Some(&m.text),
            BotCall::EditMessageText(m) => Some(&m.text),
            BotCall::AnswerCallbackQuery(m) => m.text.as_deref(),
        }
    }

    pub fn chat_id(&self) -> Option<&str> {
        match self {
            BotCall::SendMessage(m) => Some(&m.chat_id),
            BotCall::EditMessageText(m) => Some(&m.chat_id),
            BotCall::AnswerCallbackQuery(_) => None,
        }
    }
}

impl From<SendMessage> for BotCall {
    fn from(m: SendMessage) -> Self {
        BotCall::SendMessage(m)
    }
}

impl From<EditMessageText> for BotCall {
    fn from(m: EditMessageText) -> Self {
        BotCall::EditMessageText(m)
    }
}

impl From<AnswerCallbackQuery> for BotCall {
    fn from(m: AnswerCallbackQuery) -> Self {
        BotCall::AnswerCallbackQuery(m)
    }
}

/// Outgoing message sink
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn dispatch(&self, call: BotCall) -> Result<(), NotifyError>;
}

/// Fire-and-forget send; failures are logged and go no further
pub fn spawn_dispatch(notifier: Arc<dyn Notifier>, call: impl Into<BotCall>) {
    let call = call.into();
    tokio::spawn(async move {
        let method = call.method();
        let chat_id = call.chat_id().map(str::to_string);
        if let Err(e) = notifier.dispatch(call).await {
            tracing::warn!(method, chat_id = ?chat_id, error = %e, "Bot API call failed");
        }
    });
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Bot API over HTTPS
pub struct BotApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl BotApiClient {
    pub fn new(bot_token: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: format!("{BOT_API_BASE}/bot{bot_token}"),
        })
    }
}

#[async_trait]
impl Notifier for BotApiClient {
    async fn dispatch(&self, call: BotCall) -> Result<(), NotifyError> {
        let method = call.method();
        let resp: ApiResponse = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(&call.payload()?)
            .send()
            .await?
            .json()
            .await?;

        if !resp.ok {
            return Err(NotifyError::Api {
                method,
                description: resp.description.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// Keeps every call in memory; optionally fails them all
#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<BotCall>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent dispatch fail after recording it
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<BotCall> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Poll until at least `count` calls were recorded or ~2s passed
    pub async fn wait_for(&self, count: usize) -> Vec<BotCall> {
        for _ in 0..200 {
            let calls = self.calls();
            if calls.len() >= count {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.calls()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn dispatch(&self, call: BotCall) -> Result<(), NotifyError> {
        let method = call.method();
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Api {
                method,
                description: "Bad Request: chat not found".into(),
            });
        }
        Ok(())
    }
}
