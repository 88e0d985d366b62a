//! Admin order card
//!
//! Pure rendering; nothing here touches storage.

use shared::models::{MenuSnapshot, Order, OrderItem, PaymentMethod, TableNumber, User};

use super::OrderAction;
use crate::telegram::commands::{DELAY_STEP_MINUTES, OrderCallback};
use crate::telegram::messages::clock_time;
use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCard {
    pub text: String,
    /// Empty once the order is closed, which removes the buttons on edit
    pub keyboard: InlineKeyboardMarkup,
}

fn client_line(order: &Order, user: Option<&User>) -> String {
    match user {
        Some(u) => {
            let handle = u
                .username
                .as_deref()
                .map(|n| format!("@{n}"))
                .unwrap_or_else(|| u.full_name());
            format!(
                "Client: {handle} (ID: {}, Card: {})",
                u.telegram_id, u.card_number
            )
        }
        None => format!("Client: ID {}", order.user_id),
    }
}

fn item_line(item: &OrderItem, menu: Option<&MenuSnapshot>) -> String {
    let title = menu
        .and_then(|m| m.find(&item.item_id))
        .map(|m| m.display_name())
        .unwrap_or("Unknown item");
    format!("- {title} ×{} — {} RSD", item.quantity, item.line_total())
}

pub fn render_order_card(
    order: &Order,
    items: &[OrderItem],
    user: Option<&User>,
    menu: Option<&MenuSnapshot>,
) -> OrderCard {
    let location = match order.table_number {
        TableNumber::Takeaway => "Takeaway".to_string(),
        TableNumber::Table(n) => format!("Table {n}"),
    };
    let payment = match order.payment_method {
        PaymentMethod::Cash => "Cash",
        PaymentMethod::Stars => "Stars",
    };
    let items = items
        .iter()
        .map(|i| item_line(i, menu))
        .collect::<Vec<_>>()
        .join("\n");

    let mut status = format!("Status: {}", order.status.as_db().to_uppercase());
    if order.status.is_open() {
        status.push_str(&format!(" (Due: {})", clock_time(order.due_at)));
    }

    let text = format!(
        "#Order {short} · ETA {eta} min\n{client}\n📍 {location} · 💳 {payment}\nItems:\n{items}\nTotal: {total} RSD → +{stars}⭐\n---\n{status}",
        short = order.short_id,
        eta = order.eta_minutes,
        client = client_line(order, user),
        total = order.total_amount,
        stars = order.stars_added,
    );

    let keyboard = if order.status.is_open() {
        InlineKeyboardMarkup::single_row(vec![
            InlineKeyboardButton::callback(
                "✅ Mark as Ready",
                OrderCallback::encode(OrderAction::Ready, &order.id),
            ),
            InlineKeyboardButton::callback(
                format!("➕ Add {DELAY_STEP_MINUTES} min"),
                OrderCallback::encode(OrderAction::Delay(DELAY_STEP_MINUTES), &order.id),
            ),
            InlineKeyboardButton::callback(
                "⛔️ Cancel Order",
                OrderCallback::encode(OrderAction::Cancel, &order.id),
            ),
        ])
    } else {
        InlineKeyboardMarkup::empty()
    };

    OrderCard { text, keyboard }
}
