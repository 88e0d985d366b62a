//! Order pricing
//!
//! Totals come from the menu snapshot only. Client prices are never read;
//! the request carries ids and quantities and nothing else.

use serde::{Deserialize, Serialize};
use shared::models::MenuSnapshot;

/// Largest quantity accepted for a single line
pub const MAX_QUANTITY: i64 = 9999;

/// One requested line as sent by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    pub id: String,
    #[serde(default)]
    pub qty: i64,
}

/// A line that survived validation, priced from the menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    pub item_id: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: i64,
}

impl PricedLine {
    pub fn line_total(&self) -> i64 {
        self.unit_price.saturating_mul(i64::from(self.quantity))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PricedOrder {
    pub total_amount: i64,
    pub lines: Vec<PricedLine>,
}

impl PricedOrder {
    pub fn is_empty(&self) -> bool {
        self.total_amount == 0
    }
}

/// Price `requested` against `menu`
///
/// Unknown ids and non-positive quantities are dropped rather than
/// rejected. An order whose total comes out as zero must be refused by
/// the caller.
pub fn price_order(requested: &[RequestedItem], menu: &MenuSnapshot) -> PricedOrder {
    let mut order = PricedOrder::default();

    for req in requested {
        let Some(item) = menu.find(&req.id) else {
            continue;
        };
        let Ok(quantity) = i32::try_from(req.qty) else {
            continue;
        };
        if quantity <= 0 {
            continue;
        }
        let line = PricedLine {
            item_id: item.id.clone(),
            name: item.display_name().to_string(),
            quantity,
            unit_price: item.price,
        };
        order.total_amount = order.total_amount.saturating_add(line.line_total());
        order.lines.push(line);
    }

    order
}
