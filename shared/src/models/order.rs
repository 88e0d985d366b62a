//! Order Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Accepted ETA values in minutes (0 = as soon as possible)
pub const ETA_OPTIONS: [i32; 3] = [0, 10, 20];

/// Highest dine-in table number
pub const MAX_TABLE_NUMBER: u8 = 10;

/// Order status
///
/// `pending` → `ready` | `overdue` | `canceled`; `overdue` may still go to
/// `ready` or `canceled`. `ready` and `canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Ready,
    Overdue,
    Canceled,
}

impl OrderStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Overdue => "overdue",
            Self::Canceled => "canceled",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "ready" => Some(Self::Ready),
            "overdue" => Some(Self::Overdue),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// Still waiting for staff action
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Overdue)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match next {
            Self::Ready | Self::Canceled => self.is_open(),
            Self::Overdue => *self == Self::Pending,
            Self::Pending => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db())
    }
}

/// How the customer intends to pay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Stars,
}

impl PaymentMethod {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Stars => "stars",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "cash" => Some(Self::Cash),
            "stars" => Some(Self::Stars),
            _ => None,
        }
    }
}

/// Where the order is served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableNumber {
    Takeaway,
    Table(u8),
}

impl TableNumber {
    /// Parse `"takeaway"` or a table number in `1..=MAX_TABLE_NUMBER`
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value == "takeaway" {
            return Some(Self::Takeaway);
        }
        let n: u8 = value.parse().ok()?;
        (1..=MAX_TABLE_NUMBER).contains(&n).then_some(Self::Table(n))
    }

    /// Accepts a JSON string or an integer
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Self::parse(s),
            serde_json::Value::Number(n) => {
                let n = u8::try_from(n.as_u64()?).ok()?;
                (1..=MAX_TABLE_NUMBER).contains(&n).then_some(Self::Table(n))
            }
            _ => None,
        }
    }

    pub fn as_db(&self) -> String {
        match self {
            Self::Takeaway => "takeaway".to_string(),
            Self::Table(n) => n.to_string(),
        }
    }
}

impl Serialize for TableNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_db())
    }
}

impl<'de> Deserialize<'de> for TableNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid table number: {value}")))
    }
}

/// Order record
///
/// `total_amount` and `stars_added` are fixed at creation and never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// First segment of `id`, upper-cased
    pub short_id: String,
    pub user_id: i64,
    pub total_amount: i64,
    pub stars_added: i64,
    pub eta_minutes: i32,
    pub due_at: DateTime<Utc>,
    pub status: OrderStatus,
    /// Overdue alert already sent
    pub notified: bool,
    pub table_number: TableNumber,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

/// Order line, priced at order time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    /// Menu item id at the time of ordering
    pub item_id: String,
    pub quantity: i32,
    pub unit_price: i64,
}

impl OrderItem {
    pub fn line_total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Ready));
        assert!(Pending.can_transition_to(Canceled));
        assert!(Pending.can_transition_to(Overdue));
        assert!(Overdue.can_transition_to(Ready));
        assert!(Overdue.can_transition_to(Canceled));
        assert!(!Overdue.can_transition_to(Overdue));
        assert!(!Ready.can_transition_to(Canceled));
        assert!(!Canceled.can_transition_to(Ready));
        assert!(!Ready.can_transition_to(Pending));
    }

    #[test]
    fn test_status_db_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Ready,
            OrderStatus::Overdue,
            OrderStatus::Canceled,
        ] {
            assert_eq!(OrderStatus::from_db(status.as_db()), Some(status));
        }
        assert_eq!(OrderStatus::from_db("done"), None);
    }

    #[test]
    fn test_table_number_parse() {
        assert_eq!(TableNumber::parse("takeaway"), Some(TableNumber::Takeaway));
        assert_eq!(TableNumber::parse("3"), Some(TableNumber::Table(3)));
        assert_eq!(TableNumber::parse("10"), Some(TableNumber::Table(10)));
        assert_eq!(TableNumber::parse("0"), None);
        assert_eq!(TableNumber::parse("11"), None);
        assert_eq!(TableNumber::parse("terrace"), None);
    }

    #[test]
    fn test_table_number_from_json() {
        assert_eq!(TableNumber::from_json(&json!(7)), Some(TableNumber::Table(7)));
        assert_eq!(TableNumber::from_json(&json!("7")), Some(TableNumber::Table(7)));
        assert_eq!(TableNumber::from_json(&json!(-1)), None);
        assert_eq!(TableNumber::from_json(&json!(300)), None);
        assert_eq!(TableNumber::from_json(&json!(null)), None);
    }

    #[test]
    fn test_table_number_serde() {
        assert_eq!(serde_json::to_value(TableNumber::Table(3)).unwrap(), json!("3"));
        let t: TableNumber = serde_json::from_value(json!("takeaway")).unwrap();
        assert_eq!(t, TableNumber::Takeaway);
        assert!(serde_json::from_value::<TableNumber>(json!("99")).is_err());
    }

    #[test]
    fn test_line_total() {
        let item = OrderItem {
            id: "i".into(),
            order_id: "o".into(),
            item_id: "item-1".into(),
            quantity: 3,
            unit_price: 250,
        };
        assert_eq!(item.line_total(), 750);
    }
}
