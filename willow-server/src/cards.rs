//! Card registration sink
//!
//! New loyalty cards are mirrored to a spreadsheet webhook as
//! `{id, card, name, telegram}`. Best-effort; failures are logged only.

use serde::Serialize;
use serde_json::Value;
use shared::models::User;
use std::time::Duration;

use crate::BoxError;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CardRegistration {
    pub id: i64,
    pub card: i32,
    pub name: String,
    /// Username when known, the numeric id otherwise
    pub telegram: Value,
}

impl From<&User> for CardRegistration {
    fn from(user: &User) -> Self {
        Self {
            id: user.telegram_id,
            card: user.card_number,
            name: user.full_name().trim().to_string(),
            telegram: match user.username.as_deref() {
                Some(u) if !u.is_empty() => Value::from(u),
                _ => Value::from(user.telegram_id),
            },
        }
    }
}

#[derive(Clone)]
pub struct CardSink {
    client: reqwest::Client,
    url: String,
}

impl CardSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BoxError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub async fn register(&self, user: &User) -> Result<(), BoxError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&CardRegistration::from(user))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(format!("card sink returned HTTP {}", resp.status()).into());
        }
        Ok(())
    }

    /// Register in the background
    pub fn spawn_register(&self, user: User) {
        let sink = self.clone();
        tokio::spawn(async move {
            match sink.register(&user).await {
                Ok(()) => tracing::info!(card_number = user.card_number, "Card registered in sheet"),
                Err(e) => tracing::warn!(
                    card_number = user.card_number,
                    error = %e,
                    "Card registration failed"
                ),
            }
        });
    }
}
