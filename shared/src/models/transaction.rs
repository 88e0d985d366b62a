//! Ledger Transaction Model
//!
//! Append-only. For every user the sum of `stars_change` equals the current
//! star balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ledger entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Stars credited
    Accrual,
    /// Stars debited for a reward
    Redeem,
}

impl TransactionKind {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Accrual => "accrual",
            Self::Redeem => "redeem",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "accrual" => Some(Self::Accrual),
            "redeem" => Some(Self::Redeem),
            _ => None,
        }
    }
}

/// Ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: i64,
    pub kind: TransactionKind,
    /// Signed star delta
    pub stars_change: i64,
    pub order_id: Option<String>,
    pub reward_key: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
