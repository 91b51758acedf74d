//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use tower::util::ServiceExt;

use bank_cards::api::{self, middleware::PRINCIPAL_HEADER, AppState};
use bank_cards::domain::{Balance, Card, CardStatus, Clock, FixedClock, User};
use bank_cards::store::InMemoryStore;

pub const USERNAME: &str = "alice@example.com";
pub const CARD_A: &str = "1111 2222 3333 4444";
pub const CARD_B: &str = "5555 6666 7777 8888";

/// Application wired to the in-memory store and a fixed clock
pub struct TestApp {
    pub app: Router,
    pub store: InMemoryStore,
    pub clock: Arc<FixedClock>,
    pub user: User,
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 9, 0, 0).unwrap()
}

/// Build the router over a fresh store seeded with one user
pub async fn setup_app() -> TestApp {
    let store = InMemoryStore::new();
    let user = User::new(USERNAME);
    store.insert_user(user.clone()).await;

    let clock = Arc::new(FixedClock::new(
        start(),
        FixedOffset::east_opt(3 * 3600).unwrap(),
    ));
    let state = AppState::new(store.clone(), clock.clone(), 4);

    TestApp {
        app: api::build_router(state),
        store,
        clock,
        user,
    }
}

impl TestApp {
    /// Seed a card owned by the test user with limits 500 daily / 5000 monthly
    pub async fn seed_card(&self, number: &str, balance: Decimal, status: CardStatus) -> Card {
        let mut card = Card::issue(
            self.user.id,
            number.to_string(),
            NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            self.clock.now(),
        );
        card.balance = Balance::new(balance).unwrap();
        card.status = status;
        card.limit.daily_limit = dec!(500);
        card.limit.monthly_limit = dec!(5000);
        self.store.insert_card(card.clone()).await;
        card
    }

    pub async fn balance(&self, card: &Card) -> Decimal {
        self.store.card(card.id).await.unwrap().balance.value()
    }

    /// Send a request as the test user
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_as(Some(USERNAME), method, uri, body).await
    }

    /// Send a request with an optional principal; returns status and parsed JSON body
    pub async fn send_as(
        &self,
        principal: Option<&str>,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(username) = principal {
            builder = builder.header(PRINCIPAL_HEADER, username);
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }
}

/// Read a decimal field serialized as a JSON string or number
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}
