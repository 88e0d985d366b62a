//! Admin channel commands and inline button data

use crate::db::UserLookup;
use crate::ledger::AccrualGrant;
use crate::orders::OrderAction;

/// Minutes added by the "+10 min" button
pub const DELAY_STEP_MINUTES: i32 = 10;

/// `/addamount <card|@username> <rsd>` or `/addstars <card|@username> <n>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCommand {
    pub target: UserLookup,
    pub grant: AccrualGrant,
}

impl AdminCommand {
    /// `None` for anything that is not a well-formed accrual command
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let command = parts.next()?;
        // Commands addressed to the bot arrive as `/addstars@WillowBot`
        let command = command.split('@').next().unwrap_or(command);
        let target = parts.next()?;
        let value: i64 = parts.next()?.parse().ok()?;

        let grant = match command {
            "/addamount" => AccrualGrant::Amount(value),
            "/addstars" => AccrualGrant::Stars(value),
            _ => return None,
        };
        let target = match target.strip_prefix('@') {
            Some(username) if !username.is_empty() => UserLookup::Username(username.to_string()),
            Some(_) => return None,
            None => UserLookup::Card(target.parse().ok()?),
        };
        Some(Self { target, grant })
    }
}

/// `order:<ready|delay10|cancel>:<order_id>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCallback {
    pub action: OrderAction,
    pub order_id: String,
}

impl OrderCallback {
    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.splitn(3, ':');
        if parts.next()? != "order" {
            return None;
        }
        let action = match parts.next()? {
            "ready" => OrderAction::Ready,
            "delay10" => OrderAction::Delay(DELAY_STEP_MINUTES),
            "cancel" => OrderAction::Cancel,
            _ => return None,
        };
        let order_id = parts.next().filter(|id| !id.is_empty())?.to_string();
        Some(Self { action, order_id })
    }

    pub fn encode(action: OrderAction, order_id: &str) -> String {
        let action = match action {
            OrderAction::Ready => "ready",
            OrderAction::Delay(_) => "delay10",
            OrderAction::Cancel => "cancel",
        };
        format!("order:{action}:{order_id}")
    }
}
