//! Orders, menu and redemption through the HTTP API

mod common;

use chrono::Duration;
use common::{ADMIN_BEARER, ADMIN_CHAT, harness, signed_init_data};
use http::StatusCode;
use serde_json::json;
use shared::models::OrderStatus;
use willow_server::auth::TEST_USER_ID;
use willow_server::db::{LedgerStore, UserLookup};
use willow_server::telegram::BotCall;

#[tokio::test]
async fn order_is_priced_from_the_menu_and_accrues_stars() {
    let h = harness();
    let flat_white = h.item_id("Flat White").await;

    let (status, body) = h
        .request(
            "POST",
            "/api/order",
            Some(json!({
                "initData": "test",
                "items": [
                    {"id": flat_white, "qty": 2, "price": 1},
                    {"id": "item-unknown", "qty": 5},
                ],
                "eta_minutes": 10,
                "table_number": "3",
                "payment_method": "cash",
            })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["ok"], true);
    assert_eq!(body["total_amount"], 1000);
    assert_eq!(body["stars_added"], 3);
    assert_eq!(body["new_stars"], 3);
    assert_eq!(body["eta_minutes"], 10);

    let order_id = body["order_id"].as_str().unwrap();
    let short_id = body["short_id"].as_str().unwrap();
    assert_eq!(short_id, order_id.split('-').next().unwrap().to_uppercase());

    let order = h.store.find_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.due_at, order.created_at + Duration::minutes(10));
    let items = h.store.order_items(order_id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].unit_price, 500);
    assert_eq!(items[0].quantity, 2);

    // Admin card only; the test user gets no receipt
    let calls = h.notifier.wait_for(1).await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(h.notifier.calls().len(), 1);
    assert_eq!(calls[0].chat_id(), Some(ADMIN_CHAT));
    let text = calls[0].text().unwrap();
    assert!(text.starts_with(&format!("#Order {short_id} · ETA 10 min")));
    assert!(text.contains("- Flat White ×2 — 1000 RSD"));
}

#[tokio::test]
async fn real_customer_receives_localized_receipt() {
    let h = harness();
    let espresso = h.item_id("Espresso").await;
    let init_data = signed_init_data(
        r#"{"id":555,"first_name":"Ivan","last_name":"Petrov","username":"ivan","language_code":"ru"}"#,
    );

    let (status, body) = h
        .request(
            "POST",
            "/api/order",
            Some(json!({
                "initData": init_data,
                "items": [{"id": espresso, "qty": 1}],
                "eta_minutes": 0,
                "table_number": "takeaway",
                "payment_method": "stars",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["stars_added"], 1);

    let calls = h.notifier.wait_for(2).await;
    let receipt = calls
        .iter()
        .find(|c| c.chat_id() == Some("555"))
        .expect("receipt sent to customer");
    assert!(receipt.text().unwrap().starts_with("☕ Спасибо за ваш заказ!"));
}

#[tokio::test]
async fn order_validation_errors() {
    let h = harness();
    let espresso = h.item_id("Espresso").await;
    let base = json!({
        "initData": "test",
        "items": [{"id": espresso, "qty": 1}],
        "eta_minutes": 10,
        "table_number": "3",
        "payment_method": "cash",
    });

    let with = |field: &str, value: serde_json::Value| {
        let mut body = base.clone();
        body[field] = value;
        body
    };

    let cases = [
        (with("eta_minutes", json!(30)), StatusCode::BAD_REQUEST, "Invalid ETA"),
        (with("table_number", json!("11")), StatusCode::BAD_REQUEST, "Invalid table number"),
        (with("payment_method", json!("card")), StatusCode::BAD_REQUEST, "Invalid payment method"),
        (
            with("items", json!([{"id": "item-unknown", "qty": 1}])),
            StatusCode::BAD_REQUEST,
            "Invalid items or quantities",
        ),
        (
            with("items", json!([{"id": espresso, "qty": 0}])),
            StatusCode::BAD_REQUEST,
            "Invalid items or quantities",
        ),
        (with("initData", json!("user=x&hash=00")), StatusCode::FORBIDDEN, "Invalid init data"),
    ];

    for (body, expected_status, _) in cases {
        let (status, response) = h.request("POST", "/api/order", Some(body), None).await;
        assert_eq!(status, expected_status, "{response}");
        assert!(response["error"].is_string());
    }
    let (_, response) = h
        .request("POST", "/api/order", Some(with("eta_minutes", json!(30))), None)
        .await;
    assert_eq!(response["error"], "Invalid ETA");

    // Nothing was written
    assert!(
        h.store
            .find_user(&UserLookup::TelegramId(TEST_USER_ID))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn order_refused_when_menu_unavailable() {
    let h = harness();
    h.feed.set(None);

    let (status, body) = h
        .request(
            "POST",
            "/api/order",
            Some(json!({
                "initData": "test",
                "items": [{"id": "item-1", "qty": 1}],
                "eta_minutes": 10,
                "table_number": "3",
                "payment_method": "cash",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{body}");

    let (status, _) = h.request("GET", "/api/menu", None, None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn menu_served_from_cache_when_feed_fails() {
    let h = harness();

    let (status, headers, first) = h.raw("GET", "/api/menu", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["cache-control"], "public, max-age=60");
    assert_eq!(first["items"].as_array().unwrap().len(), 2);
    assert_eq!(first["categories"], json!(["Coffee"]));

    h.feed.set(None);
    h.clock.advance(Duration::seconds(30));
    let (status, second) = h.request("GET", "/api/menu", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second, first);

    // Past the TTL the refresh fails, and the stale menu is still served
    h.clock.advance(Duration::seconds(60));
    let (status, third) = h.request("GET", "/api/menu", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(third, first);
}

#[tokio::test]
async fn auth_creates_user_once() {
    let h = harness();
    let init_data = signed_init_data(r#"{"id":42,"first_name":"Ana","username":"ana"}"#);

    let (status, first) = h
        .request("POST", "/api/auth/telegram", Some(json!({"initData": init_data})), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["telegram_id"], 42);
    assert_eq!(first["stars"], 0);
    let card = first["card_number"].as_i64().unwrap();
    assert!((1000..=9999).contains(&card));

    let (_, second) = h
        .request("POST", "/api/auth/telegram", Some(json!({"initData": init_data})), None)
        .await;
    assert_eq!(second["card_number"], card);

    let (status, body) = h
        .request("POST", "/api/auth/telegram", Some(json!({})), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "initData is required");

    let tampered = init_data.replace("Ana", "Eve");
    let (status, _) = h
        .request("POST", "/api/auth/telegram", Some(json!({"initData": tampered})), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn redeem_requires_enough_stars() {
    let h = harness();
    h.request("POST", "/api/auth/telegram", Some(json!({"initData": "test"})), None)
        .await;
    let (status, _) = h
        .request(
            "POST",
            "/api/admin/accrue",
            Some(json!({"by": "telegram_id", "id": TEST_USER_ID, "stars": 5})),
            Some(ADMIN_BEARER),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h
        .request(
            "POST",
            "/api/redeem",
            Some(json!({"telegram_id": TEST_USER_ID, "rewardKey": "free_espresso"})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "NOT_ENOUGH_STARS");

    let user = h
        .store
        .find_user(&UserLookup::TelegramId(TEST_USER_ID))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.stars, 5);

    h.request(
        "POST",
        "/api/admin/accrue",
        Some(json!({"by": "telegram_id", "id": TEST_USER_ID, "amount": 1750})),
        Some(ADMIN_BEARER),
    )
    .await;
    let (status, body) = h
        .request(
            "POST",
            "/api/redeem",
            Some(json!({"telegram_id": TEST_USER_ID, "rewardKey": "free_espresso"})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["new_total"], 0);

    let (status, _) = h
        .request(
            "POST",
            "/api/redeem",
            Some(json!({"telegram_id": TEST_USER_ID, "rewardKey": "free_yacht"})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h
        .request(
            "POST",
            "/api/redeem",
            Some(json!({"telegram_id": 1, "rewardKey": "free_espresso"})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ledger_matches_balance_after_mixed_operations() {
    let h = harness();
    let flat_white = h.item_id("Flat White").await;
    let order = json!({
        "initData": "test",
        "items": [{"id": flat_white, "qty": 3}],
        "eta_minutes": 20,
        "table_number": 4,
        "payment_method": "cash",
    });

    for _ in 0..3 {
        let (status, _) = h.request("POST", "/api/order", Some(order.clone()), None).await;
        assert_eq!(status, StatusCode::OK);
    }
    h.request(
        "POST",
        "/api/redeem",
        Some(json!({"telegram_id": TEST_USER_ID, "rewardKey": "free_espresso"})),
        None,
    )
    .await;
    h.request(
        "POST",
        "/api/admin/accrue",
        Some(json!({"by": "username", "id": "@testuser", "stars": 7})),
        Some(ADMIN_BEARER),
    )
    .await;

    let user = h
        .store
        .find_user(&UserLookup::TelegramId(TEST_USER_ID))
        .await
        .unwrap()
        .unwrap();
    let entries = h.store.transactions_for_user(TEST_USER_ID).await.unwrap();
    let sum: i64 = entries.iter().map(|t| t.stars_change).sum();
    // 3 orders × 5 stars, minus 10, plus 7
    assert_eq!(user.stars, 12);
    assert_eq!(user.stars, sum);
    assert_eq!(entries.len(), 5);
}

#[tokio::test]
async fn admin_card_buttons_target_the_order() {
    let h = harness();
    let espresso = h.item_id("Espresso").await;
    let (_, body) = h
        .request(
            "POST",
            "/api/order",
            Some(json!({
                "initData": "test",
                "items": [{"id": espresso, "qty": 1}],
                "eta_minutes": 10,
                "table_number": "takeaway",
                "payment_method": "cash",
            })),
            None,
        )
        .await;
    let order_id = body["order_id"].as_str().unwrap();

    let calls = h.notifier.wait_for(1).await;
    let BotCall::SendMessage(card) = &calls[0] else {
        panic!("expected sendMessage, got {:?}", calls[0]);
    };
    let buttons = &card.reply_markup.as_ref().unwrap().inline_keyboard[0];
    let data: Vec<_> = buttons
        .iter()
        .map(|b| b.callback_data.clone().unwrap())
        .collect();
    assert_eq!(
        data,
        vec![
            format!("order:ready:{order_id}"),
            format!("order:delay10:{order_id}"),
            format!("order:cancel:{order_id}"),
        ]
    );
}
