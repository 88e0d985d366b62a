//! Menu sourcing
//!
//! The menu lives in a spreadsheet published as CSV. [`MenuCache`] keeps
//! the last parsed [`MenuSnapshot`](shared::models::MenuSnapshot) and is
//! the only price source for orders.

pub mod cache;
pub mod feed;
pub mod parser;

pub use cache::MenuCache;
pub use feed::{FeedError, HttpMenuFeed, MenuFeed};
