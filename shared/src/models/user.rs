//! Loyalty User Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Loyalty program member, keyed by Telegram user id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub telegram_id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: String,
    /// Unique 4-digit loyalty card number
    pub card_number: i32,
    /// Current star balance, never negative
    pub stars: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// "First Last", or just the first name
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref() {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }

    pub fn language(&self) -> Language {
        Language::from_code(&self.language_code)
    }
}

/// Languages customer-facing messages are rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
    Sr,
}

impl Language {
    /// Map a Telegram `language_code`; anything unknown falls back to English
    pub fn from_code(code: &str) -> Self {
        match code.split(['-', '_']).next().unwrap_or_default() {
            "ru" => Self::Ru,
            "sr" => Self::Sr,
            _ => Self::En,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ru => "ru",
            Self::Sr => "sr",
        }
    }
}
