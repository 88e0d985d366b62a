//! Bot API webhook
//!
//! Private chat commands, admin channel accrual commands and the order
//! card buttons. Anything else is acknowledged and ignored.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use shared::error::{AppError, ErrorCode};

use crate::db::UserLookup;
use crate::error::{ServiceError, ServiceResult};
use crate::orders::OrderAction;
use crate::state::AppState;
use crate::telegram::commands::{AdminCommand, OrderCallback};
use crate::telegram::messages;
use crate::telegram::types::{CallbackQuery, Message};
use crate::telegram::{
    AnswerCallbackQuery, EditMessageText, InlineKeyboardButton, InlineKeyboardMarkup, SendMessage,
    Update, spawn_dispatch,
};

pub async fn handle_update(
    State(state): State<AppState>,
    payload: Result<Json<Update>, JsonRejection>,
) -> ServiceResult<&'static str> {
    let Json(update) = payload.map_err(AppError::from)?;

    if let Some(message) = update.message {
        handle_message(&state, &message).await?;
    } else if let Some(post) = update.channel_post {
        handle_channel_post(&state, &post).await;
    } else if let Some(query) = update.callback_query {
        handle_callback(&state, &query).await?;
    }

    Ok("OK")
}

/// First word without a `@BotName` suffix
fn command_word(text: &str) -> &str {
    let word = text.split_whitespace().next().unwrap_or_default();
    word.split('@').next().unwrap_or(word)
}

async fn handle_message(state: &AppState, message: &Message) -> ServiceResult<()> {
    let Some(text) = message.text.as_deref() else {
        return Ok(());
    };
    let chat_id = message.chat.id;

    let reply = match command_word(text) {
        "/start" => SendMessage::new(chat_id, messages::WELCOME).with_markup(
            InlineKeyboardMarkup::single_row(vec![InlineKeyboardButton::web_app(
                messages::OPEN_APP_BUTTON,
                state.config.webapp_url.clone(),
            )]),
        ),
        "/mycard" => {
            let sender = message.from.as_ref().map_or(chat_id, |u| u.id);
            let user = state
                .ledger
                .find_user(&UserLookup::TelegramId(sender))
                .await?;
            let text = match user {
                Some(u) => messages::card_number(u.card_number),
                None => messages::NO_CARD_YET.to_string(),
            };
            SendMessage::new(chat_id, text)
        }
        _ => return Ok(()),
    };

    spawn_dispatch(state.notifier.clone(), reply);
    Ok(())
}

async fn handle_channel_post(state: &AppState, post: &Message) {
    let in_admin_channel = state
        .orders
        .admin_chat()
        .is_some_and(|chat| chat == post.chat.id.to_string());
    if !in_admin_channel {
        return;
    }
    let Some(command) = post.text.as_deref().and_then(AdminCommand::parse) else {
        return;
    };

    let reply = match state.ledger.admin_accrue(&command.target, command.grant).await {
        Ok(user) => messages::accrual_success(&user),
        Err(e) => {
            let error: AppError = e.into();
            messages::command_error(&error.message)
        }
    };
    spawn_dispatch(
        state.notifier.clone(),
        SendMessage::new(post.chat.id, reply).reply_to(post.message_id),
    );
}

fn answer(state: &AppState, query: &CallbackQuery, text: impl Into<String>) {
    spawn_dispatch(
        state.notifier.clone(),
        AnswerCallbackQuery {
            callback_query_id: query.id.clone(),
            text: Some(text.into()),
        },
    );
}

async fn handle_callback(state: &AppState, query: &CallbackQuery) -> ServiceResult<()> {
    let Some(callback) = query.data.as_deref().and_then(OrderCallback::parse) else {
        return Ok(());
    };

    let order = match state.orders.apply(&callback.order_id, callback.action).await {
        Ok(order) => order,
        Err(ServiceError::App(e)) if e.code == ErrorCode::OrderNotFound => {
            answer(state, query, messages::ORDER_NOT_FOUND);
            return Ok(());
        }
        Err(ServiceError::App(e)) if e.code == ErrorCode::InvalidTransition => {
            answer(state, query, messages::ORDER_CLOSED);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    if let Some(card_message) = &query.message {
        let card = state.orders.render_card(&order).await?;
        spawn_dispatch(
            state.notifier.clone(),
            EditMessageText {
                chat_id: card_message.chat.id.to_string(),
                message_id: card_message.message_id,
                text: card.text,
                reply_markup: Some(card.keyboard),
            },
        );
    }

    let confirmation = match callback.action {
        OrderAction::Ready => messages::marked_ready(&order.short_id),
        OrderAction::Delay(minutes) => messages::delayed(&order.short_id, minutes, order.due_at),
        OrderAction::Cancel => messages::canceled(&order.short_id),
    };
    answer(state, query, confirmation);
    Ok(())
}
