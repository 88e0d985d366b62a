//! Telegram Bot API surface
//!
//! - [`types`]: the slice of update payloads this bot reads
//! - [`client`]: outgoing calls and the [`Notifier`] seam
//! - [`commands`]: admin channel commands and callback data
//! - [`messages`]: user-facing text

pub mod client;
pub mod commands;
pub mod messages;
pub mod types;

pub use client::{
    AnswerCallbackQuery, BotApiClient, BotCall, EditMessageText, NotifyError, Notifier,
    RecordingNotifier, SendMessage, spawn_dispatch,
};
pub use types::{InlineKeyboardButton, InlineKeyboardMarkup, Update};
