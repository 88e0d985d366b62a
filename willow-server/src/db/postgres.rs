//! PostgreSQL adapter
//!
//! Multi-row writes run inside `pool.begin()`; an early return drops the
//! transaction, which rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::{
    Order, OrderItem, OrderStatus, PaymentMethod, Reward, TableNumber, Transaction,
    TransactionKind, User,
};
use sqlx::PgConnection;
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::{LedgerStore, NewUser, StoreError, UserLookup};

const CARD_NUMBER_CONSTRAINT: &str = "users_card_number_key";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and bring the schema up to date
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    short_id: String,
    user_id: i64,
    total_amount: i64,
    stars_added: i64,
    eta_minutes: i32,
    due_at: DateTime<Utc>,
    status: String,
    notified: bool,
    table_number: String,
    payment_method: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, StoreError> {
        let status = OrderStatus::from_db(&row.status)
            .ok_or_else(|| StoreError::Internal(format!("unknown order status: {}", row.status)))?;
        let table_number = TableNumber::parse(&row.table_number).ok_or_else(|| {
            StoreError::Internal(format!("unknown table number: {}", row.table_number))
        })?;
        let payment_method = PaymentMethod::from_db(&row.payment_method).ok_or_else(|| {
            StoreError::Internal(format!("unknown payment method: {}", row.payment_method))
        })?;
        Ok(Order {
            id: row.id,
            short_id: row.short_id,
            user_id: row.user_id,
            total_amount: row.total_amount,
            stars_added: row.stars_added,
            eta_minutes: row.eta_minutes,
            due_at: row.due_at,
            status,
            notified: row.notified,
            table_number,
            payment_method,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: String,
    user_id: i64,
    kind: String,
    stars_change: i64,
    order_id: Option<String>,
    reward_key: Option<String>,
    description: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, StoreError> {
        let kind = TransactionKind::from_db(&row.kind)
            .ok_or_else(|| StoreError::Internal(format!("unknown transaction kind: {}", row.kind)))?;
        Ok(Transaction {
            id: row.id,
            user_id: row.user_id,
            kind,
            stars_change: row.stars_change,
            order_id: row.order_id,
            reward_key: row.reward_key,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

fn status_list(statuses: &[OrderStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_db().to_string()).collect()
}

async fn insert_transaction(conn: &mut PgConnection, entry: &Transaction) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO transactions (id, user_id, kind, stars_change, order_id, reward_key, description, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(&entry.id)
    .bind(entry.user_id)
    .bind(entry.kind.as_db())
    .bind(entry.stars_change)
    .bind(&entry.order_id)
    .bind(&entry.reward_key)
    .bind(&entry.description)
    .bind(entry.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

async fn credit_user(
    conn: &mut PgConnection,
    user_id: i64,
    stars: i64,
) -> Result<User, StoreError> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET stars = stars + $1 WHERE telegram_id = $2 RETURNING *",
    )
    .bind(stars)
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .ok_or(StoreError::NotFound)
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn find_user(&self, lookup: &UserLookup) -> Result<Option<User>, StoreError> {
        let user = match lookup {
            UserLookup::Card(card) => {
                sqlx::query_as::<_, User>("SELECT * FROM users WHERE card_number = $1")
                    .bind(card)
                    .fetch_optional(&self.pool)
                    .await?
            }
            UserLookup::Username(username) => {
                sqlx::query_as::<_, User>(
                    "SELECT * FROM users WHERE lower(username) = lower($1) ORDER BY created_at LIMIT 1",
                )
                .bind(username)
                .fetch_optional(&self.pool)
                .await?
            }
            UserLookup::TelegramId(id) => {
                sqlx::query_as::<_, User>("SELECT * FROM users WHERE telegram_id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(user)
    }

    async fn card_number_taken(&self, card_number: i32) -> Result<bool, StoreError> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE card_number = $1)")
                .bind(card_number)
                .fetch_one(&self.pool)
                .await?;
        Ok(taken)
    }

    async fn insert_user(&self, user: &NewUser) -> Result<Option<User>, StoreError> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (telegram_id, first_name, last_name, username, language_code, card_number, stars, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 0, $7)
            ON CONFLICT (telegram_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(user.telegram_id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.username)
        .bind(&user.language_code)
        .bind(user.card_number)
        .bind(user.created_at)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row),
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some(CARD_NUMBER_CONSTRAINT) =>
            {
                Err(StoreError::DuplicateCard(user.card_number))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_order(
        &self,
        order: &Order,
        items: &[OrderItem],
        accrual: &Transaction,
    ) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, short_id, user_id, total_amount, stars_added, eta_minutes, due_at,
                                status, notified, table_number, payment_method, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&order.id)
        .bind(&order.short_id)
        .bind(order.user_id)
        .bind(order.total_amount)
        .bind(order.stars_added)
        .bind(order.eta_minutes)
        .bind(order.due_at)
        .bind(order.status.as_db())
        .bind(order.notified)
        .bind(order.table_number.as_db())
        .bind(order.payment_method.as_db())
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, item_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.item_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        insert_transaction(&mut tx, accrual).await?;
        let user = credit_user(&mut tx, order.user_id, accrual.stars_change).await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn find_reward(&self, key: &str) -> Result<Option<Reward>, StoreError> {
        let reward = sqlx::query_as::<_, Reward>("SELECT * FROM rewards WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reward)
    }

    async fn redeem(
        &self,
        user_id: i64,
        reward: &Reward,
        entry: &Transaction,
    ) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The row lock taken by the conditional update serializes
        // concurrent redemptions for the same user.
        let debited = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET stars = stars - $1
            WHERE telegram_id = $2 AND stars >= $1
            RETURNING *
            "#,
        )
        .bind(reward.stars_cost)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user) = debited else {
            let balance: Option<i64> =
                sqlx::query_scalar("SELECT stars FROM users WHERE telegram_id = $1")
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return match balance {
                None => Err(StoreError::NotFound),
                Some(balance) => Err(StoreError::NotEnoughStars {
                    balance,
                    cost: reward.stars_cost,
                }),
            };
        };

        insert_transaction(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn accrue(&self, entry: &Transaction) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;
        let user = credit_user(&mut tx, entry.user_id, entry.stars_change).await?;
        insert_transaction(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn find_order(&self, id: &str) -> Result<Option<Order>, StoreError> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn order_items(&self, order_id: &str) -> Result<Vec<OrderItem>, StoreError> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = $1 ORDER BY seq",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn transition_order(
        &self,
        id: &str,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Option<Order>, StoreError> {
        sqlx::query_as::<_, OrderRow>(
            "UPDATE orders SET status = $1 WHERE id = $2 AND status = ANY($3) RETURNING *",
        )
        .bind(to.as_db())
        .bind(id)
        .bind(status_list(from))
        .fetch_optional(&self.pool)
        .await?
        .map(Order::try_from)
        .transpose()
    }

    async fn delay_order(
        &self,
        id: &str,
        from: &[OrderStatus],
        minutes: i32,
    ) -> Result<Option<Order>, StoreError> {
        sqlx::query_as::<_, OrderRow>(
            r#"
            UPDATE orders SET due_at = due_at + make_interval(mins => $1)
            WHERE id = $2 AND status = ANY($3)
            RETURNING *
            "#,
        )
        .bind(minutes)
        .bind(id)
        .bind(status_list(from))
        .fetch_optional(&self.pool)
        .await?
        .map(Order::try_from)
        .transpose()
    }

    async fn claim_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            UPDATE orders SET status = 'overdue', notified = TRUE
            WHERE status = 'pending' AND notified = FALSE AND due_at <= $1
            RETURNING *
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn transactions_for_user(&self, user_id: i64) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }
}
