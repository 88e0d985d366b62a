//! In-memory adapter
//!
//! Used in development without `DATABASE_URL` and by the tests. Each write
//! works on a copy of the state and swaps it in only on success, so a
//! failing step leaves nothing behind. The schema constraints of the
//! Postgres tables are checked here too.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use shared::models::{Order, OrderItem, OrderStatus, Reward, Transaction, TransactionKind, User};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{LedgerStore, NewUser, StoreError, UserLookup};

/// Rewards seeded into a fresh store (mirrors the initial migration)
pub fn default_rewards() -> Vec<Reward> {
    [
        ("free_espresso", "Free Espresso", 10),
        ("free_cappuccino", "Free Cappuccino", 15),
        ("free_dessert", "Free Dessert", 20),
    ]
    .into_iter()
    .map(|(key, title, stars_cost)| Reward {
        key: key.to_string(),
        title: title.to_string(),
        stars_cost,
    })
    .collect()
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<i64, User>,
    orders: HashMap<String, Order>,
    order_items: Vec<OrderItem>,
    transactions: Vec<Transaction>,
    rewards: HashMap<String, Reward>,
}

impl MemoryState {
    fn user_mut(&mut self, id: i64) -> Result<&mut User, StoreError> {
        self.users.get_mut(&id).ok_or(StoreError::NotFound)
    }

    fn credit(&mut self, id: i64, stars: i64) -> Result<User, StoreError> {
        let user = self.user_mut(id)?;
        let balance = user
            .stars
            .checked_add(stars)
            .ok_or_else(|| StoreError::Internal(format!("users.stars overflow for {id}")))?;
        if balance < 0 {
            return Err(StoreError::Internal(format!(
                "users.stars would become negative for {id}"
            )));
        }
        user.stars = balance;
        Ok(user.clone())
    }

    fn append(&mut self, entry: &Transaction) -> Result<(), StoreError> {
        if !self.users.contains_key(&entry.user_id) {
            return Err(StoreError::NotFound);
        }
        if self.transactions.iter().any(|t| t.id == entry.id) {
            return Err(StoreError::Internal(format!(
                "duplicate transaction id {}",
                entry.id
            )));
        }
        self.transactions.push(entry.clone());
        Ok(())
    }

    fn update_order(
        &mut self,
        id: &str,
        from: &[OrderStatus],
        apply: impl FnOnce(&mut Order),
    ) -> Option<Order> {
        let order = self.orders.get_mut(id)?;
        if !from.contains(&order.status) {
            return None;
        }
        apply(order);
        Some(order.clone())
    }
}

pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_rewards(default_rewards())
    }

    pub fn with_rewards(rewards: impl IntoIterator<Item = Reward>) -> Self {
        let state = MemoryState {
            rewards: rewards.into_iter().map(|r| (r.key.clone(), r)).collect(),
            ..MemoryState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Run `f` against a copy of the state and keep the result only on `Ok`
    async fn write<T>(
        &self,
        f: impl FnOnce(&mut MemoryState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.state.lock().await;
        let mut draft = guard.clone();
        let out = f(&mut draft)?;
        *guard = draft;
        Ok(out)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn find_user(&self, lookup: &UserLookup) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().await;
        let user = match lookup {
            UserLookup::TelegramId(id) => state.users.get(id),
            UserLookup::Card(card) => state.users.values().find(|u| u.card_number == *card),
            UserLookup::Username(name) => state
                .users
                .values()
                .filter(|u| {
                    u.username
                        .as_deref()
                        .is_some_and(|n| n.eq_ignore_ascii_case(name))
                })
                .min_by_key(|u| u.created_at),
        };
        Ok(user.cloned())
    }

    async fn card_number_taken(&self, card_number: i32) -> Result<bool, StoreError> {
        let state = self.state.lock().await;
        Ok(state.users.values().any(|u| u.card_number == card_number))
    }

    async fn insert_user(&self, user: &NewUser) -> Result<Option<User>, StoreError> {
        self.write(|state| {
            if state.users.contains_key(&user.telegram_id) {
                return Ok(None);
            }
            if state.users.values().any(|u| u.card_number == user.card_number) {
                return Err(StoreError::DuplicateCard(user.card_number));
            }
            let row = User {
                telegram_id: user.telegram_id,
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                username: user.username.clone(),
                language_code: user.language_code.clone(),
                card_number: user.card_number,
                stars: 0,
                created_at: user.created_at,
            };
            state.users.insert(row.telegram_id, row.clone());
            Ok(Some(row))
        })
        .await
    }

    async fn create_order(
        &self,
        order: &Order,
        items: &[OrderItem],
        accrual: &Transaction,
    ) -> Result<User, StoreError> {
        self.write(|state| {
            if state.orders.contains_key(&order.id) {
                return Err(StoreError::Internal(format!("duplicate order id {}", order.id)));
            }
            if order.total_amount <= 0 {
                return Err(StoreError::Internal("orders.total_amount must be positive".into()));
            }
            state.orders.insert(order.id.clone(), order.clone());

            for item in items {
                if item.quantity <= 0 {
                    return Err(StoreError::Internal(
                        "order_items.quantity must be positive".into(),
                    ));
                }
                if item.order_id != order.id {
                    return Err(StoreError::Internal(format!(
                        "order item {} references unknown order {}",
                        item.id, item.order_id
                    )));
                }
                state.order_items.push(item.clone());
            }

            if accrual.kind == TransactionKind::Accrual
                && state.transactions.iter().any(|t| {
                    t.kind == TransactionKind::Accrual
                        && t.order_id.is_some()
                        && t.order_id == accrual.order_id
                })
            {
                return Err(StoreError::Internal(format!(
                    "order {} already accrued",
                    order.id
                )));
            }
            state.append(accrual)?;
            state.credit(order.user_id, accrual.stars_change)
        })
        .await
    }

    async fn find_reward(&self, key: &str) -> Result<Option<Reward>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.rewards.get(key).cloned())
    }

    async fn redeem(
        &self,
        user_id: i64,
        reward: &Reward,
        entry: &Transaction,
    ) -> Result<User, StoreError> {
        self.write(|state| {
            let balance = state.user_mut(user_id)?.stars;
            if balance < reward.stars_cost {
                return Err(StoreError::NotEnoughStars {
                    balance,
                    cost: reward.stars_cost,
                });
            }
            let user = state.credit(user_id, -reward.stars_cost)?;
            state.append(entry)?;
            Ok(user)
        })
        .await
    }

    async fn accrue(&self, entry: &Transaction) -> Result<User, StoreError> {
        self.write(|state| {
            let user = state.credit(entry.user_id, entry.stars_change)?;
            state.append(entry)?;
            Ok(user)
        })
        .await
    }

    async fn find_order(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.orders.get(id).cloned())
    }

    async fn order_items(&self, order_id: &str) -> Result<Vec<OrderItem>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn transition_order(
        &self,
        id: &str,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Option<Order>, StoreError> {
        self.write(|state| Ok(state.update_order(id, from, |o| o.status = to)))
            .await
    }

    async fn delay_order(
        &self,
        id: &str,
        from: &[OrderStatus],
        minutes: i32,
    ) -> Result<Option<Order>, StoreError> {
        self.write(|state| {
            Ok(state.update_order(id, from, |o| {
                o.due_at += Duration::minutes(i64::from(minutes));
            }))
        })
        .await
    }

    async fn claim_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Order>, StoreError> {
        self.write(|state| {
            let mut claimed: Vec<Order> = state
                .orders
                .values_mut()
                .filter(|o| o.status == OrderStatus::Pending && !o.notified && o.due_at <= now)
                .map(|o| {
                    o.status = OrderStatus::Overdue;
                    o.notified = true;
                    o.clone()
                })
                .collect();
            claimed.sort_by(|a, b| a.due_at.cmp(&b.due_at));
            Ok(claimed)
        })
        .await
    }

    async fn transactions_for_user(&self, user_id: i64) -> Result<Vec<Transaction>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }
}
