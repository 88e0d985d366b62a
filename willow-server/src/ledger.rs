//! Loyalty ledger
//!
//! Storage-agnostic rules for users, orders and stars. Every balance
//! change goes through the store together with its transaction entry, so
//! a user's balance always equals the sum of their entries.

use chrono::Duration;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Order, OrderItem, OrderStatus, PaymentMethod, Reward, TableNumber, Transaction,
    TransactionKind, User,
};
use shared::util::stars_for_amount;
use std::sync::Arc;

use crate::auth::TelegramUser;
use crate::cards::CardSink;
use crate::clock::Clock;
use crate::db::{LedgerStore, NewUser, StoreError, UserLookup};
use crate::error::{ServiceError, ServiceResult};
use crate::identity;
use crate::pricing::{PricedLine, PricedOrder};

/// Insert attempts when card numbers keep colliding
pub const MAX_CARD_ATTEMPTS: usize = 5;

/// What an admin grants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccrualGrant {
    /// Explicit star count
    Stars(i64),
    /// Purchase amount in RSD, converted at the accrual rate
    Amount(i64),
}

impl AccrualGrant {
    pub fn stars(&self) -> i64 {
        match self {
            AccrualGrant::Stars(n) => *n,
            AccrualGrant::Amount(amount) => stars_for_amount(*amount),
        }
    }

    pub fn description(&self) -> String {
        match self {
            AccrualGrant::Stars(n) => format!("Admin manual add: {n} stars"),
            AccrualGrant::Amount(amount) => format!("Admin amount accrual: {amount} RSD"),
        }
    }
}

/// A validated, priced order ready to be written
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub priced: PricedOrder,
    pub eta_minutes: i32,
    pub table_number: TableNumber,
    pub payment_method: PaymentMethod,
}

/// Result of a committed order
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub lines: Vec<PricedLine>,
    /// Owner with the post-accrual balance
    pub user: User,
}

#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    card_sink: Option<CardSink>,
}

fn user_not_found(e: StoreError) -> ServiceError {
    match e {
        StoreError::NotFound => AppError::new(ErrorCode::UserNotFound).into(),
        other => other.into(),
    }
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
        card_sink: Option<CardSink>,
    ) -> Self {
        Self {
            store,
            clock,
            card_sink,
        }
    }

    pub async fn find_user(&self, lookup: &UserLookup) -> ServiceResult<Option<User>> {
        Ok(self.store.find_user(lookup).await?)
    }

    /// Existing user for this Telegram account, or a new one with a fresh card
    pub async fn get_or_create_user(&self, tg: &TelegramUser) -> ServiceResult<User> {
        if let Some(user) = self.store.find_user(&UserLookup::TelegramId(tg.id)).await? {
            return Ok(user);
        }

        for attempt in 1..=MAX_CARD_ATTEMPTS {
            let card_number = identity::allocate_card_number(self.store.as_ref()).await?;
            let new_user = NewUser {
                telegram_id: tg.id,
                first_name: tg.first_name.clone(),
                last_name: tg.last_name.clone(),
                username: tg.username.clone(),
                language_code: tg.language_code.clone().unwrap_or_else(|| "en".into()),
                card_number,
                created_at: self.clock.now(),
            };

            match self.store.insert_user(&new_user).await {
                Ok(Some(user)) => {
                    tracing::info!(
                        telegram_id = user.telegram_id,
                        card_number = user.card_number,
                        "Loyalty card issued"
                    );
                    if let Some(sink) = &self.card_sink {
                        sink.spawn_register(user.clone());
                    }
                    return Ok(user);
                }
                Ok(None) => {
                    // Lost the race to a concurrent first login
                    return self
                        .store
                        .find_user(&UserLookup::TelegramId(tg.id))
                        .await?
                        .ok_or_else(|| {
                            ServiceError::Db(format!("user {} vanished after insert", tg.id).into())
                        });
                }
                Err(StoreError::DuplicateCard(card)) => {
                    tracing::debug!(attempt, card_number = card, "Card number collided, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Db(
            format!("could not assign a card number after {MAX_CARD_ATTEMPTS} attempts").into(),
        ))
    }

    /// Write the order, its lines and the accrual as one unit
    pub async fn place_order(&self, tg: &TelegramUser, draft: OrderDraft) -> ServiceResult<PlacedOrder> {
        if draft.priced.is_empty() {
            return Err(AppError::new(ErrorCode::OrderEmpty).into());
        }

        let owner = self.get_or_create_user(tg).await?;
        let now = self.clock.now();
        let ids = identity::new_order_id();
        let total_amount = draft.priced.total_amount;
        let stars_added = stars_for_amount(total_amount);

        let order = Order {
            id: ids.id,
            short_id: ids.short_id,
            user_id: owner.telegram_id,
            total_amount,
            stars_added,
            eta_minutes: draft.eta_minutes,
            due_at: now + Duration::minutes(i64::from(draft.eta_minutes)),
            status: OrderStatus::Pending,
            notified: false,
            table_number: draft.table_number,
            payment_method: draft.payment_method,
            created_at: now,
        };

        let items: Vec<OrderItem> = draft
            .priced
            .lines
            .iter()
            .map(|line| OrderItem {
                id: identity::new_record_id(),
                order_id: order.id.clone(),
                item_id: line.item_id.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();

        let accrual = Transaction {
            id: identity::new_record_id(),
            user_id: owner.telegram_id,
            kind: TransactionKind::Accrual,
            stars_change: stars_added,
            order_id: Some(order.id.clone()),
            reward_key: None,
            description: format!("Order {}", order.short_id),
            created_at: now,
        };

        let user = self
            .store
            .create_order(&order, &items, &accrual)
            .await
            .map_err(user_not_found)?;

        tracing::info!(
            order_id = %order.id,
            short_id = %order.short_id,
            user_id = user.telegram_id,
            total_amount,
            stars_added,
            "Order placed"
        );

        Ok(PlacedOrder {
            order,
            items,
            lines: draft.priced.lines,
            user,
        })
    }

    /// Spend stars on a reward
    pub async fn redeem(&self, telegram_id: i64, reward_key: &str) -> ServiceResult<(User, Reward)> {
        let reward = self
            .store
            .find_reward(reward_key)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::RewardNotFound))?;

        let entry = Transaction {
            id: identity::new_record_id(),
            user_id: telegram_id,
            kind: TransactionKind::Redeem,
            stars_change: -reward.stars_cost,
            order_id: None,
            reward_key: Some(reward.key.clone()),
            description: format!("Redeemed {}", reward.title),
            created_at: self.clock.now(),
        };

        let user = match self.store.redeem(telegram_id, &reward, &entry).await {
            Ok(user) => user,
            Err(StoreError::NotEnoughStars { balance, cost }) => {
                tracing::info!(telegram_id, balance, cost, reward = %reward.key, "Redemption refused");
                return Err(AppError::new(ErrorCode::NotEnoughStars).into());
            }
            Err(e) => return Err(user_not_found(e)),
        };

        tracing::info!(
            telegram_id,
            reward = %reward.key,
            new_total = user.stars,
            "Reward redeemed"
        );
        Ok((user, reward))
    }

    /// Credit stars by admin decision
    pub async fn admin_accrue(&self, target: &UserLookup, grant: AccrualGrant) -> ServiceResult<User> {
        let stars = grant.stars();
        if stars <= 0 {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                "Stars to add must be positive",
            )
            .into());
        }

        let user = self
            .store
            .find_user(target)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

        let entry = Transaction {
            id: identity::new_record_id(),
            user_id: user.telegram_id,
            kind: TransactionKind::Accrual,
            stars_change: stars,
            order_id: None,
            reward_key: None,
            description: grant.description(),
            created_at: self.clock.now(),
        };

        let user = self.store.accrue(&entry).await.map_err(user_not_found)?;
        tracing::info!(
            telegram_id = user.telegram_id,
            stars,
            new_total = user.stars,
            "Admin accrual"
        );
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::db::MemoryStore;
    use crate::pricing::PricedLine;

    fn service() -> (LedgerService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let ledger = LedgerService::new(store.clone(), Arc::new(SystemClock), None);
        (ledger, store)
    }

    fn tg(id: i64) -> TelegramUser {
        TelegramUser {
            id,
            first_name: "Ana".into(),
            last_name: None,
            username: Some(format!("ana{id}")),
            language_code: None,
        }
    }

    fn draft(total: i64) -> OrderDraft {
        OrderDraft {
            priced: PricedOrder {
                total_amount: total,
                lines: vec![PricedLine {
                    item_id: "X".into(),
                    name: "X".into(),
                    quantity: 1,
                    unit_price: total,
                }],
            },
            eta_minutes: 10,
            table_number: TableNumber::Takeaway,
            payment_method: PaymentMethod::Cash,
        }
    }

    async fn assert_ledger_consistent(store: &MemoryStore, user_id: i64) {
        let user = store
            .find_user(&UserLookup::TelegramId(user_id))
            .await
            .unwrap()
            .unwrap();
        let sum: i64 = store
            .transactions_for_user(user_id)
            .await
            .unwrap()
            .iter()
            .map(|t| t.stars_change)
            .sum();
        assert_eq!(user.stars, sum);
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let (ledger, _) = service();
        let first = ledger.get_or_create_user(&tg(1)).await.unwrap();
        let second = ledger.get_or_create_user(&tg(1)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.language_code, "en");
        assert_eq!(first.stars, 0);
    }

    #[tokio::test]
    async fn test_concurrent_first_logins_get_distinct_cards() {
        let (ledger, store) = service();

        let handles: Vec<_> = (0..300)
            .map(|n| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.get_or_create_user(&tg(n % 150)).await })
            })
            .collect();
        let mut by_id = std::collections::HashMap::new();
        for h in handles {
            let user = h.await.unwrap().unwrap();
            let card = *by_id.entry(user.telegram_id).or_insert(user.card_number);
            assert_eq!(card, user.card_number);
        }

        assert_eq!(by_id.len(), 150);
        let cards: std::collections::HashSet<i32> = by_id.values().copied().collect();
        assert_eq!(cards.len(), 150);
        for id in 0..150 {
            let user = store
                .find_user(&UserLookup::TelegramId(id))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(by_id[&id], user.card_number);
        }
    }

    #[tokio::test]
    async fn test_place_order_accrues() {
        let (ledger, store) = service();
        let placed = ledger.place_order(&tg(1), draft(1000)).await.unwrap();
        assert_eq!(placed.order.stars_added, 3);
        assert_eq!(placed.user.stars, 3);
        assert_eq!(placed.order.status, OrderStatus::Pending);

        let entries = store.transactions_for_user(1).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].order_id.as_deref(), Some(placed.order.id.as_str()));
        assert_eq!(entries[0].description, format!("Order {}", placed.order.short_id));
        assert_ledger_consistent(&store, 1).await;
    }

    #[tokio::test]
    async fn test_empty_order_rejected() {
        let (ledger, store) = service();
        let err = ledger.place_order(&tg(1), draft(0)).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::OrderEmpty));
        assert!(store.find_user(&UserLookup::TelegramId(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redeem_not_enough_stars() {
        let (ledger, store) = service();
        ledger.get_or_create_user(&tg(1)).await.unwrap();
        ledger
            .admin_accrue(&UserLookup::TelegramId(1), AccrualGrant::Stars(5))
            .await
            .unwrap();

        let err = ledger.redeem(1, "free_espresso").await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NotEnoughStars));
        let user = store.find_user(&UserLookup::TelegramId(1)).await.unwrap().unwrap();
        assert_eq!(user.stars, 5);
        assert_eq!(store.transactions_for_user(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_redeem_errors() {
        let (ledger, _) = service();
        let err = ledger.redeem(1, "no_such_reward").await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::RewardNotFound));
        let err = ledger.redeem(1, "free_espresso").await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::UserNotFound));
    }

    #[tokio::test]
    async fn test_admin_accrue_grants() {
        let (ledger, store) = service();
        let user = ledger.get_or_create_user(&tg(1)).await.unwrap();

        let by_card = UserLookup::Card(user.card_number);
        let updated = ledger.admin_accrue(&by_card, AccrualGrant::Amount(700)).await.unwrap();
        assert_eq!(updated.stars, 2);
        let updated = ledger
            .admin_accrue(&UserLookup::Username("ANA1".into()), AccrualGrant::Stars(4))
            .await
            .unwrap();
        assert_eq!(updated.stars, 6);

        let descriptions: Vec<String> = store
            .transactions_for_user(1)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.description)
            .collect();
        assert_eq!(
            descriptions,
            vec!["Admin amount accrual: 700 RSD", "Admin manual add: 4 stars"]
        );

        let err = ledger.admin_accrue(&by_card, AccrualGrant::Stars(0)).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ValueOutOfRange));
        let err = ledger.admin_accrue(&by_card, AccrualGrant::Amount(-350)).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ValueOutOfRange));
        let err = ledger
            .admin_accrue(&UserLookup::Card(1), AccrualGrant::Stars(1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::UserNotFound));
        assert_ledger_consistent(&store, 1).await;
    }

    #[tokio::test]
    async fn test_huge_amount_accrual_does_not_overflow() {
        let (ledger, store) = service();
        let user = ledger.get_or_create_user(&tg(1)).await.unwrap();
        let by_card = UserLookup::Card(user.card_number);

        let updated = ledger
            .admin_accrue(&by_card, AccrualGrant::Amount(i64::MAX))
            .await
            .unwrap();
        assert_eq!(updated.stars, i64::MAX / 350 + 1);

        // Balance would pass i64::MAX: refused as an internal error, nothing written
        let err = ledger
            .admin_accrue(&by_card, AccrualGrant::Stars(i64::MAX))
            .await
            .unwrap_err();
        assert_eq!(err.code(), None);
        assert_eq!(store.transactions_for_user(1).await.unwrap().len(), 1);
        assert_ledger_consistent(&store, 1).await;
    }

    #[tokio::test]
    async fn test_concurrent_redemptions_never_overspend() {
        let (ledger, store) = service();
        ledger.get_or_create_user(&tg(1)).await.unwrap();
        ledger
            .admin_accrue(&UserLookup::TelegramId(1), AccrualGrant::Stars(25))
            .await
            .unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.redeem(1, "free_espresso").await })
            })
            .collect();
        let mut succeeded = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 2);
        let user = store.find_user(&UserLookup::TelegramId(1)).await.unwrap().unwrap();
        assert_eq!(user.stars, 5);
        assert_ledger_consistent(&store, 1).await;
    }
}
