//! Identifier allocation
//!
//! Card numbers are short and therefore checked against the store;
//! order ids are v4 UUIDs and are not.

use rand::Rng;
use uuid::Uuid;

use crate::db::{LedgerStore, StoreError};

pub const CARD_NUMBER_MIN: i32 = 1000;
pub const CARD_NUMBER_MAX: i32 = 9999;

/// Draws per allocation before giving up
pub const MAX_CARD_DRAWS: usize = 50;

pub fn random_card_number() -> i32 {
    rand::thread_rng().gen_range(CARD_NUMBER_MIN..=CARD_NUMBER_MAX)
}

/// A card number no existing user holds
///
/// The insert can still race with another allocation; callers retry on
/// `DuplicateCard`.
pub async fn allocate_card_number(store: &dyn LedgerStore) -> Result<i32, StoreError> {
    for _ in 0..MAX_CARD_DRAWS {
        let candidate = random_card_number();
        if !store.card_number_taken(candidate).await? {
            return Ok(candidate);
        }
        tracing::debug!(card_number = candidate, "Card number taken, drawing again");
    }
    Err(StoreError::Internal(format!(
        "no free card number after {MAX_CARD_DRAWS} draws"
    )))
}

/// Order identifier and its staff-facing short code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderIdentity {
    pub id: String,
    pub short_id: String,
}

pub fn new_order_id() -> OrderIdentity {
    let id = Uuid::new_v4().to_string();
    let short_id = short_code(&id);
    OrderIdentity { id, short_id }
}

/// First hyphen-delimited segment, upper-cased
pub fn short_code(id: &str) -> String {
    id.split('-').next().unwrap_or(id).to_uppercase()
}

pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, NewUser};
    use chrono::Utc;
    use std::collections::HashSet;

    #[test]
    fn test_card_number_range() {
        for _ in 0..1000 {
            let n = random_card_number();
            assert!((CARD_NUMBER_MIN..=CARD_NUMBER_MAX).contains(&n));
        }
    }

    #[test]
    fn test_short_code() {
        assert_eq!(short_code("3f2a9c1b-aaaa-4bbb-8ccc-dddddddddddd"), "3F2A9C1B");
        let order = new_order_id();
        assert_eq!(order.short_id.len(), 8);
        assert!(order.id.to_uppercase().starts_with(&order.short_id));
    }

    #[tokio::test]
    async fn test_allocation_avoids_taken_numbers() {
        let store = MemoryStore::new();
        let mut seen = HashSet::new();
        for i in 0..200 {
            let card = allocate_card_number(&store).await.unwrap();
            assert!(seen.insert(card), "card {card} handed out twice");
            store
                .insert_user(&NewUser {
                    telegram_id: i,
                    first_name: format!("user{i}"),
                    last_name: None,
                    username: None,
                    language_code: "en".into(),
                    card_number: card,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
    }
}
