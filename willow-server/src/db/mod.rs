//! Ledger and order storage
//!
//! [`LedgerStore`] is the only way the service touches persisted state.
//! Every method that writes more than one row is a single all-or-nothing
//! unit inside the adapter: either every row lands or none does.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::{Order, OrderItem, OrderStatus, Reward, Transaction, User};
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("not enough stars: balance {balance}, cost {cost}")]
    NotEnoughStars { balance: i64, cost: i64 },
    #[error("card number {0} is already assigned")]
    DuplicateCard(i32),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("{0}")]
    Internal(String),
}

/// How to find a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Card(i32),
    /// Case-insensitive, without the leading `@`
    Username(String),
    TelegramId(i64),
}

/// User row to insert on first contact
#[derive(Debug, Clone)]
pub struct NewUser {
    pub telegram_id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: String,
    pub card_number: i32,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_user(&self, lookup: &UserLookup) -> Result<Option<User>, StoreError>;

    async fn card_number_taken(&self, card_number: i32) -> Result<bool, StoreError>;

    /// Insert a user unless one with the same telegram id exists
    ///
    /// Returns `None` when the telegram id was already present and
    /// `DuplicateCard` when the card number collides.
    async fn insert_user(&self, user: &NewUser) -> Result<Option<User>, StoreError>;

    /// Insert the order, its lines and the accrual entry, and credit the
    /// user, as one unit. Returns the user with the new balance.
    async fn create_order(
        &self,
        order: &Order,
        items: &[OrderItem],
        accrual: &Transaction,
    ) -> Result<User, StoreError>;

    async fn find_reward(&self, key: &str) -> Result<Option<Reward>, StoreError>;

    /// Debit `reward.stars_cost` and append the redeem entry as one unit
    ///
    /// `NotFound` when the user does not exist, `NotEnoughStars` when the
    /// balance is short. Neither leaves a trace.
    async fn redeem(
        &self,
        user_id: i64,
        reward: &Reward,
        entry: &Transaction,
    ) -> Result<User, StoreError>;

    /// Credit `entry.stars_change` to `entry.user_id` and append the entry
    async fn accrue(&self, entry: &Transaction) -> Result<User, StoreError>;

    async fn find_order(&self, id: &str) -> Result<Option<Order>, StoreError>;

    async fn order_items(&self, order_id: &str) -> Result<Vec<OrderItem>, StoreError>;

    /// Move the order to `to` if its current status is one of `from`
    ///
    /// `None` when the order is missing or in another status.
    async fn transition_order(
        &self,
        id: &str,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Option<Order>, StoreError>;

    /// Push `due_at` back by `minutes` if the status is one of `from`
    async fn delay_order(
        &self,
        id: &str,
        from: &[OrderStatus],
        minutes: i32,
    ) -> Result<Option<Order>, StoreError>;

    /// Mark every un-notified pending order due at or before `now` as
    /// overdue and notified, returning exactly the orders this call claimed
    async fn claim_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Order>, StoreError>;

    async fn transactions_for_user(&self, user_id: i64) -> Result<Vec<Transaction>, StoreError>;
}
