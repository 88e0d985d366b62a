//! Data models
//!
//! Shared between the server, its storage adapters and the API.
//! Row types with only primitive columns use
//! `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.

pub mod menu;
pub mod order;
pub mod reward;
pub mod transaction;
pub mod user;

// Re-exports
pub use menu::*;
pub use order::*;
pub use reward::*;
pub use transaction::*;
pub use user::*;
