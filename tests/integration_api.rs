//! API integration tests
//!
//! Drive the full router (middleware included) over the in-memory store.

use axum::http::StatusCode;
use chrono::Duration;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

use bank_cards::domain::{BlockStatus, CardStatus, OperationKind, OperationResult};

mod common;

use common::{decimal, setup_app, CARD_A, CARD_B};

#[tokio::test]
async fn test_health_check() {
    let app = setup_app().await;

    let (status, body) = app.send_as(None, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn test_withdrawal_e2e() {
    let app = setup_app().await;
    let card = app.seed_card(CARD_A, dec!(1000), CardStatus::Active).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/transfer/withdrawal",
            Some(json!({ "number": CARD_A, "amount": "100.00" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "withdrawal failed: {body}");
    assert_eq!(body["number"], "**** **** **** 4444");
    assert_eq!(decimal(&body["withdrawal_amount"]), dec!(100));
    assert_eq!(decimal(&body["remaining_balance"]), dec!(900));
    assert_eq!(body["card_id"], card.id.to_string());
    assert_eq!(app.balance(&card).await, dec!(900));

    let rows = app.store.transactions().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].operation, OperationKind::Withdrawal);
    assert_eq!(rows[0].operation_result, OperationResult::Successfully);
}

#[tokio::test]
async fn test_withdrawal_requires_principal() {
    let app = setup_app().await;
    app.seed_card(CARD_A, dec!(1000), CardStatus::Active).await;

    let (status, body) = app
        .send_as(
            None,
            "POST",
            "/api/v1/transfer/withdrawal",
            Some(json!({ "number": CARD_A, "amount": "100.00" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "missing_principal");
    assert!(app.store.transactions().await.is_empty());
}

#[tokio::test]
async fn test_malformed_fields_are_reported_together() {
    let app = setup_app().await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/transfer",
            Some(json!({ "number": "1111-2222", "target_number": CARD_B, "amount": "-5" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_code"], "validation_failed");
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["number", "amount"]);
}

#[tokio::test]
async fn test_recharge_below_minimum_is_rejected() {
    let app = setup_app().await;
    let card = app.seed_card(CARD_A, dec!(10), CardStatus::Active).await;

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/transfer/recharge",
            Some(json!({ "number": CARD_A, "amount": "4.99" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/transfer/recharge",
            Some(json!({ "number": CARD_A, "amount": "5.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["balance"]), dec!(15));
    assert_eq!(app.balance(&card).await, dec!(15));
}

#[tokio::test]
async fn test_unknown_card_returns_not_found() {
    let app = setup_app().await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/transfer/withdrawal",
            Some(json!({ "number": CARD_A, "amount": "10.00" })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "card_not_found");
    assert!(app.store.transactions().await.is_empty());
}

#[tokio::test]
async fn test_other_users_card_is_not_visible() {
    let app = setup_app().await;
    app.seed_card(CARD_A, dec!(1000), CardStatus::Active).await;

    let (status, _) = app
        .send_as(
            Some("mallory@example.com"),
            "POST",
            "/api/v1/transfer/withdrawal",
            Some(json!({ "number": CARD_A, "amount": "10.00" })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_insufficient_balance_records_failure() {
    let app = setup_app().await;
    let card = app.seed_card(CARD_A, dec!(50), CardStatus::Active).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/transfer/withdrawal",
            Some(json!({ "number": CARD_A, "amount": "60.00" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "insufficient_balance");
    assert_eq!(app.balance(&card).await, dec!(50));

    let rows = app.store.transactions().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].operation_result, OperationResult::Failed);
}

#[tokio::test]
async fn test_transfer_between_own_cards() {
    let app = setup_app().await;
    let source = app.seed_card(CARD_A, dec!(300), CardStatus::Active).await;
    let target = app.seed_card(CARD_B, dec!(20), CardStatus::Active).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/transfer",
            Some(json!({ "number": CARD_A, "target_number": CARD_B, "amount": "120.50" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "transfer failed: {body}");
    assert_eq!(body["target_number"], "**** **** **** 8888");
    assert_eq!(decimal(&body["balance"]), dec!(179.50));
    assert_eq!(app.balance(&source).await, dec!(179.50));
    assert_eq!(app.balance(&target).await, dec!(140.50));

    let rows = app.store.transactions().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].target_card_id, Some(target.id));
}

#[tokio::test]
async fn test_transfer_to_same_card_is_rejected() {
    let app = setup_app().await;
    let card = app.seed_card(CARD_A, dec!(300), CardStatus::Active).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/transfer",
            Some(json!({ "number": CARD_A, "target_number": CARD_A, "amount": "10.00" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "cards_are_the_same");
    assert_eq!(app.balance(&card).await, dec!(300));
}

#[tokio::test]
async fn test_block_request_flow() {
    let app = setup_app().await;
    let card = app.seed_card(CARD_A, dec!(100), CardStatus::Active).await;
    let uri = format!("/api/v1/block/{}", card.id);

    // 1. Open a request
    let (status, body) = app.send("PATCH", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT, "block request failed: {body}");

    // 2. A second request inside the cooldown conflicts
    app.clock.advance(Duration::days(6));
    let (status, body) = app.send("PATCH", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "block_request_cooldown");

    // 3. Approve the open request
    let request = app.store.block_requests().await.remove(0);
    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/v1/block/{}/status", request.id),
            Some(json!({ "status": "COMPLETED" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "resolve failed: {body}");
    assert_eq!(body["status"], "COMPLETED");
    assert_eq!(app.store.card(card.id).await.unwrap().status, CardStatus::Blocked);

    // 4. The blocked card can no longer be withdrawn from
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/transfer/withdrawal",
            Some(json!({ "number": CARD_A, "amount": "10.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "card_blocked");

    // 5. A blocked card cannot be blocked again
    app.clock.advance(Duration::days(2));
    let (status, body) = app.send("PATCH", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "card_already_blocked");
}

#[tokio::test]
async fn test_block_request_resolution_rejects_unknown_status() {
    let app = setup_app().await;
    let card = app.seed_card(CARD_A, dec!(100), CardStatus::Active).await;
    app.send("PATCH", &format!("/api/v1/block/{}", card.id), None)
        .await;
    let request = app.store.block_requests().await.remove(0);

    let (status, _) = app
        .send(
            "PUT",
            &format!("/api/v1/block/{}/status", request.id),
            Some(json!({ "status": "CREATED" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.store.block_requests().await[0].status, BlockStatus::Created);
}

#[tokio::test]
async fn test_admin_card_lifecycle() {
    let app = setup_app().await;

    // 1. Issue
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/admin/cards",
            Some(json!({ "user_id": app.user.id, "number": CARD_A })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "issue failed: {body}");
    assert_eq!(body["number"], "**** **** **** 4444");
    assert_eq!(body["status"], "ACTIVE");
    assert_eq!(body["expiration_date"], "2029-06-15");
    let card_id: Uuid = body["id"].as_str().unwrap().parse().unwrap();

    // 2. Duplicate number conflicts
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/admin/cards",
            Some(json!({ "user_id": app.user.id, "number": CARD_A })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "card_already_exists");

    // 3. Raise the daily limit
    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/v1/admin/cards/{card_id}/limits/daily"),
            Some(json!({ "limit": "250.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "limit update failed: {body}");
    assert_eq!(decimal(&body["daily_limit"]), dec!(250));
    assert_eq!(decimal(&body["monthly_limit"]), dec!(0));

    // 4. Block through the admin route
    let (status, _) = app
        .send(
            "PATCH",
            &format!("/api/v1/admin/cards/{card_id}/status"),
            Some(json!({ "status": "BLOCKED" })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.store.card(card_id).await.unwrap().status, CardStatus::Blocked);

    // 5. Delete, then the card is gone
    let uri = format!("/api/v1/admin/cards/{card_id}");
    let (status, _) = app.send("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.store.card(card_id).await.is_none());

    let (status, _) = app.send("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_issue_card_for_unknown_user() {
    let app = setup_app().await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/admin/cards",
            Some(json!({ "user_id": Uuid::new_v4(), "number": CARD_A })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "user_not_found");
}

#[tokio::test]
async fn test_admin_cannot_set_expired_status() {
    let app = setup_app().await;
    let card = app.seed_card(CARD_A, dec!(100), CardStatus::Active).await;

    let (status, _) = app
        .send(
            "PATCH",
            &format!("/api/v1/admin/cards/{}/status", card.id),
            Some(json!({ "status": "EXPIRED" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.store.card(card.id).await.unwrap().status, CardStatus::Active);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = setup_app().await;

    let request = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::util::ServiceExt::oneshot(app.app.clone(), request)
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}
