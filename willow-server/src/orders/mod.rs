//! Order lifecycle
//!
//! Staff actions from the admin channel and the overdue sweep. Every
//! transition is a conditional update in the store, so two staff members
//! pressing buttons at once cannot both win.

pub mod card;

use shared::error::{AppError, ErrorCode};
use shared::models::{Language, Order, OrderStatus};
use std::sync::Arc;

use crate::auth::TEST_USER_ID;
use crate::clock::Clock;
use crate::db::{LedgerStore, UserLookup};
use crate::error::ServiceResult;
use crate::ledger::PlacedOrder;
use crate::menu::MenuCache;
use crate::telegram::messages;
use crate::telegram::{Notifier, SendMessage, spawn_dispatch};

pub use card::{OrderCard, render_order_card};

/// Statuses staff can still act on
const OPEN: [OrderStatus; 2] = [OrderStatus::Pending, OrderStatus::Overdue];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Ready,
    /// Push the due time back by this many minutes
    Delay(i32),
    Cancel,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn Notifier>,
    menu: MenuCache,
    clock: Arc<dyn Clock>,
    admin_chat: Option<String>,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        notifier: Arc<dyn Notifier>,
        menu: MenuCache,
        clock: Arc<dyn Clock>,
        admin_chat: Option<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            menu,
            clock,
            admin_chat,
        }
    }

    pub fn admin_chat(&self) -> Option<&str> {
        self.admin_chat.as_deref()
    }

    /// Apply a staff action and return the updated order
    ///
    /// `OrderNotFound` for unknown ids, `InvalidTransition` when the order
    /// is already closed. Neither mutates anything.
    pub async fn apply(&self, order_id: &str, action: OrderAction) -> ServiceResult<Order> {
        if self.store.find_order(order_id).await?.is_none() {
            return Err(AppError::new(ErrorCode::OrderNotFound).into());
        }

        let updated = match action {
            OrderAction::Ready => {
                self.store
                    .transition_order(order_id, &OPEN, OrderStatus::Ready)
                    .await?
            }
            OrderAction::Cancel => {
                self.store
                    .transition_order(order_id, &OPEN, OrderStatus::Canceled)
                    .await?
            }
            OrderAction::Delay(minutes) => {
                self.store.delay_order(order_id, &OPEN, minutes).await?
            }
        };
        let Some(order) = updated else {
            tracing::info!(order_id, ?action, "Order action refused, order is closed");
            return Err(AppError::new(ErrorCode::InvalidTransition).into());
        };

        tracing::info!(
            order_id = %order.id,
            short_id = %order.short_id,
            status = %order.status,
            due_at = %order.due_at,
            ?action,
            "Order updated"
        );

        match action {
            OrderAction::Ready => self.notify_customer(&order, messages::order_ready).await,
            OrderAction::Cancel => self.notify_customer(&order, messages::order_canceled).await,
            OrderAction::Delay(_) => {}
        }
        Ok(order)
    }

    async fn notify_customer(
        &self,
        order: &Order,
        text: fn(Language) -> &'static str,
    ) {
        if order.user_id == TEST_USER_ID {
            return;
        }
        let lang = match self.store.find_user(&UserLookup::TelegramId(order.user_id)).await {
            Ok(Some(user)) => user.language(),
            Ok(None) => Default::default(),
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "Could not load customer language");
                Default::default()
            }
        };
        spawn_dispatch(
            self.notifier.clone(),
            SendMessage::new(order.user_id, text(lang)),
        );
    }

    /// Current admin card for an order, rendered from the cached menu
    pub async fn render_card(&self, order: &Order) -> ServiceResult<OrderCard> {
        let items = self.store.order_items(&order.id).await?;
        let user = self
            .store
            .find_user(&UserLookup::TelegramId(order.user_id))
            .await?;
        let menu = self.menu.peek().await;
        Ok(render_order_card(order, &items, user.as_ref(), menu.as_deref()))
    }

    /// Post the admin card and the customer receipt for a new order
    pub async fn notify_new_order(&self, placed: &PlacedOrder) {
        if let Some(chat) = &self.admin_chat {
            let menu = self.menu.peek().await;
            let card = render_order_card(
                &placed.order,
                &placed.items,
                Some(&placed.user),
                menu.as_deref(),
            );
            spawn_dispatch(
                self.notifier.clone(),
                SendMessage::new(chat, card.text).with_markup(card.keyboard),
            );
        }

        if placed.user.telegram_id != TEST_USER_ID {
            let receipt = messages::order_receipt(
                placed.user.language(),
                &placed.order,
                &placed.lines,
            );
            spawn_dispatch(
                self.notifier.clone(),
                SendMessage::new(placed.user.telegram_id, receipt),
            );
        }
    }

    /// Promote due pending orders to overdue and alert the admin channel
    ///
    /// Each order is claimed once; a second pass over the same orders
    /// returns nothing.
    pub async fn sweep_overdue(&self) -> ServiceResult<Vec<Order>> {
        let claimed = self.store.claim_overdue(self.clock.now()).await?;
        for order in &claimed {
            tracing::info!(
                order_id = %order.id,
                short_id = %order.short_id,
                due_at = %order.due_at,
                "Order overdue"
            );
            if let Some(chat) = &self.admin_chat {
                spawn_dispatch(
                    self.notifier.clone(),
                    SendMessage::new(chat, messages::overdue_alert(order)),
                );
            }
        }
        Ok(claimed)
    }
}
