//! willow-server: Willow Coffee loyalty backend
//!
//! Serves the menu to the Telegram mini app, accepts orders, keeps the
//! stars ledger and drives orders through their lifecycle from the admin
//! channel.

pub mod api;
pub mod auth;
pub mod cards;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod logger;
pub mod menu;
pub mod orders;
pub mod pricing;
pub mod state;
pub mod tasks;
pub mod telegram;

pub use config::Config;
pub use state::AppState;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
