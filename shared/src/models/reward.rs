//! Reward Model

use serde::{Deserialize, Serialize};

/// Redeemable reward (read-only reference data)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Reward {
    pub key: String,
    pub title: String,
    pub stars_cost: i64,
}
