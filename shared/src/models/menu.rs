//! Menu Models
//!
//! A [`MenuSnapshot`] is replaced wholesale on every refresh and never
//! mutated in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::Language;

/// Item title in every supported language
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedTitle {
    pub en: String,
    pub ru: String,
    pub sr: String,
}

impl LocalizedTitle {
    /// Title in `lang`, falling back to English when that cell is empty
    pub fn get(&self, lang: Language) -> &str {
        let title = match lang {
            Language::En => &self.en,
            Language::Ru => &self.ru,
            Language::Sr => &self.sr,
        };
        if title.is_empty() { &self.en } else { title }
    }
}

/// Menu item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Content-derived fingerprint of (category, English title, volume)
    pub id: String,
    pub category: String,
    pub title: LocalizedTitle,
    pub volume: String,
    /// Price in the smallest currency unit
    pub price: i64,
    pub ingredients: String,
}

impl MenuItem {
    /// Name shown to staff
    pub fn display_name(&self) -> &str {
        if self.title.en.is_empty() {
            "Unknown item"
        } else {
            &self.title.en
        }
    }
}

/// Parsed menu as served by `GET /api/menu`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuSnapshot {
    pub updated_at: DateTime<Utc>,
    /// Distinct categories, first-seen order
    pub categories: Vec<String>,
    pub items: Vec<MenuItem>,
}

impl MenuSnapshot {
    /// Build a snapshot, deriving the category list from the items
    pub fn new(updated_at: DateTime<Utc>, items: Vec<MenuItem>) -> Self {
        let mut categories: Vec<String> = Vec::new();
        for item in &items {
            if !categories.contains(&item.category) {
                categories.push(item.category.clone());
            }
        }
        Self {
            updated_at,
            categories,
            items,
        }
    }

    /// Item by id; later duplicates win
    pub fn find(&self, id: &str) -> Option<&MenuItem> {
        self.items.iter().rev().find(|i| i.id == id)
    }
}
