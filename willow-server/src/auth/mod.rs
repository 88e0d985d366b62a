//! Request authentication
//!
//! - Mini app requests carry Telegram `initData`, checked by [`InitDataVerifier`]
//! - Admin endpoints carry a static bearer secret, checked by [`admin_auth_middleware`]
//! - Bot API updates carry the webhook secret token, checked by [`webhook_secret_middleware`]

pub mod admin;
pub mod init_data;
pub mod webhook;

pub use admin::admin_auth_middleware;
pub use webhook::webhook_secret_middleware;
pub use init_data::{InitDataVerifier, TEST_USER_ID, TelegramUser};
