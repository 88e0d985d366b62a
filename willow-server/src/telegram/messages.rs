//! User-facing message text

use chrono::{DateTime, Utc};
use shared::models::{Language, Order, PaymentMethod, TableNumber, User};
use shared::util::stars_for_amount;

use crate::pricing::PricedLine;

pub const WELCOME: &str = "Welcome to Willow Coffee! Click below to open the app.";
pub const OPEN_APP_BUTTON: &str = "☕ Open App";
pub const NO_CARD_YET: &str = "You don't have a card yet. Open the app to get one!";
pub const ORDER_NOT_FOUND: &str = "Order not found!";
pub const ORDER_CLOSED: &str = "Order is already closed.";

/// Clock time shown to staff
pub fn clock_time(at: DateTime<Utc>) -> String {
    at.format("%H:%M:%S").to_string()
}

pub fn card_number(card: i32) -> String {
    format!("Your loyalty card number is: {card}")
}

pub fn accrual_success(user: &User) -> String {
    let handle = user
        .username
        .as_deref()
        .map(|u| format!("@{u}"))
        .unwrap_or_else(|| user.full_name());
    format!(
        "✅ Success! User {handle} (Card: {}) now has {} stars.",
        user.card_number, user.stars
    )
}

pub fn command_error(message: &str) -> String {
    format!("❌ Error: {message}")
}

pub fn overdue_alert(order: &Order) -> String {
    format!(
        "❗️ Overdue: Order #{} was due at {}.",
        order.short_id,
        clock_time(order.due_at)
    )
}

pub fn marked_ready(short_id: &str) -> String {
    format!("✅ Order {short_id} marked as Ready.")
}

pub fn delayed(short_id: &str, minutes: i32, due_at: DateTime<Utc>) -> String {
    format!(
        "➕ Order {short_id} delayed by {minutes} minutes. New ETA: {}",
        clock_time(due_at)
    )
}

pub fn canceled(short_id: &str) -> String {
    format!("⛔️ Order {short_id} has been canceled.")
}

pub fn order_ready(lang: Language) -> &'static str {
    match lang {
        Language::En => "Your order is ready for pickup!",
        Language::Ru => "Ваш заказ готов к выдаче!",
        Language::Sr => "Vaša narudžba je spremna za preuzimanje!",
    }
}

pub fn order_canceled(lang: Language) -> &'static str {
    match lang {
        Language::En => "Unfortunately, your order has been canceled.",
        Language::Ru => "К сожалению, ваш заказ был отменен.",
        Language::Sr => "Nažalost, vaša narudžba je otkazana.",
    }
}

struct ReceiptText {
    title: &'static str,
    order_number: &'static str,
    your_items: &'static str,
    ready_in: &'static str,
    payment: &'static str,
    total: &'static str,
    stars_earned: &'static str,
    footer: &'static str,
    takeaway: &'static str,
    table: &'static str,
    now: &'static str,
    minutes: &'static str,
    cash: &'static str,
    stars: &'static str,
}

const RECEIPT_EN: ReceiptText = ReceiptText {
    title: "☕ Thank you for your order!",
    order_number: "🎫 Order #",
    your_items: "📋 Your Items:",
    ready_in: "⏰ Ready in:",
    payment: "💳 Payment:",
    total: "💰 Total:",
    stars_earned: "⭐ Stars Earned:",
    footer: "We'll start preparing your order shortly. Thank you for choosing Willow Coffee! ☕",
    takeaway: "Takeaway",
    table: "Table",
    now: "Now",
    minutes: "minutes",
    cash: "Cash",
    stars: "Stars",
};

const RECEIPT_RU: ReceiptText = ReceiptText {
    title: "☕ Спасибо за ваш заказ!",
    order_number: "🎫 Заказ №",
    your_items: "📋 Ваши товары:",
    ready_in: "⏰ Будет готов через:",
    payment: "💳 Оплата:",
    total: "💰 Итого:",
    stars_earned: "⭐ Звёзд получено:",
    footer: "Мы скоро начнём готовить ваш заказ. Спасибо, что выбрали Willow Coffee! ☕",
    takeaway: "На вынос",
    table: "Столик",
    now: "Сейчас",
    minutes: "минут",
    cash: "Наличные",
    stars: "Звёзды",
};

const RECEIPT_SR: ReceiptText = ReceiptText {
    title: "☕ Hvala Vam na porudžbini!",
    order_number: "🎫 Narudžba #",
    your_items: "📋 Vaše stavke:",
    ready_in: "⏰ Spremno za:",
    payment: "💳 Plaćanje:",
    total: "💰 Ukupno:",
    stars_earned: "⭐ Zvezda dobijeno:",
    footer: "Uskoro počinjemo sa pripremom. Hvala što ste izabrali Willow Coffee! ☕",
    takeaway: "Za poneti",
    table: "Sto",
    now: "Sada",
    minutes: "minuta",
    cash: "Gotovina",
    stars: "Zvezde",
};

fn receipt_text(lang: Language) -> &'static ReceiptText {
    match lang {
        Language::En => &RECEIPT_EN,
        Language::Ru => &RECEIPT_RU,
        Language::Sr => &RECEIPT_SR,
    }
}

/// Order confirmation sent to the customer's private chat
pub fn order_receipt(lang: Language, order: &Order, lines: &[PricedLine]) -> String {
    let t = receipt_text(lang);

    let eta = match order.eta_minutes {
        0 => t.now.to_string(),
        m => format!("{m} {}", t.minutes),
    };
    let location = match order.table_number {
        TableNumber::Takeaway => t.takeaway.to_string(),
        TableNumber::Table(n) => format!("{} {n}", t.table),
    };
    let payment = match order.payment_method {
        PaymentMethod::Cash => t.cash.to_string(),
        PaymentMethod::Stars => {
            format!("{} ({} ⭐)", t.stars, stars_for_amount(order.total_amount))
        }
    };
    let items = lines
        .iter()
        .map(|l| format!("• {} x{} - {} RSD", l.name, l.quantity, l.line_total()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{title}\n\n{order_number}{short}\n\n{your_items}\n{items}\n\n📍 {location}\n{ready_in} {eta}\n{payment_label} {payment}\n\n{total_label} {total} RSD\n{stars_label} +{stars} ⭐\n\n{footer}",
        title = t.title,
        order_number = t.order_number,
        short = order.short_id,
        your_items = t.your_items,
        ready_in = t.ready_in,
        payment_label = t.payment,
        total_label = t.total,
        total = order.total_amount,
        stars_label = t.stars_earned,
        stars = order.stars_added,
        footer = t.footer,
    )
}
