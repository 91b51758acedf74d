//! Withdrawal load test
//!
//! Fires concurrent withdrawals at one card on the in-memory store and checks
//! that the balance never goes negative and every attempt left a ledger row.
//!
//! Run with: cargo run --bin load_test --release -- --requests 1000 --balance 5000

use std::sync::Arc;
use std::time::Instant;

use chrono::{FixedOffset, Months, Utc};
use rust_decimal::Decimal;

use bank_cards::domain::{
    Amount, Balance, Card, Clock, OperationResult, SharedClock, SystemClock, User,
};
use bank_cards::handlers::{WithdrawalCommand, WithdrawalHandler};
use bank_cards::store::InMemoryStore;

const CARD_NUMBER: &str = "4000 0000 0000 0001";

fn arg<T: std::str::FromStr>(args: &[String], name: &str, default: T) -> T {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let requests: u64 = arg(&args, "--requests", 1000);
    let balance: Decimal = arg(&args, "--balance", Decimal::new(5000, 0));
    let amount: Decimal = arg(&args, "--amount", Decimal::new(10, 0));

    let offset_minutes: i32 = arg(&args, "--offset-minutes", 180);
    let zone = FixedOffset::east_opt(offset_minutes * 60)
        .ok_or_else(|| anyhow::anyhow!("invalid offset: {} minutes", offset_minutes))?;
    let clock: SharedClock = Arc::new(SystemClock::new(zone));

    let store = InMemoryStore::new();
    let user = User::new("load-test@example.com");
    store.insert_user(user.clone()).await;

    let expiration = clock
        .today()
        .checked_add_months(Months::new(12))
        .ok_or_else(|| anyhow::anyhow!("expiration date out of range"))?;
    let mut card = Card::issue(user.id, CARD_NUMBER.to_string(), expiration, Utc::now());
    card.balance = Balance::new(balance)?;
    card.limit.daily_limit = balance;
    card.limit.monthly_limit = balance;
    store.insert_card(card.clone()).await;

    let amount = Amount::new(amount)?;

    println!("Load Test - {} withdrawals of {} from a balance of {}", requests, amount, balance);

    let start = Instant::now();
    let mut tasks = Vec::with_capacity(requests as usize);

    for _ in 0..requests {
        let handler = WithdrawalHandler::new(store.clone(), clock.clone());
        let command =
            WithdrawalCommand::new(user.username.clone(), CARD_NUMBER.to_string(), amount.clone());
        tasks.push(tokio::spawn(async move { handler.execute(command).await }));
    }

    let mut success_count = 0u64;
    for task in tasks {
        if task.await?.is_ok() {
            success_count += 1;
        }
    }

    let elapsed = start.elapsed();
    let rate = requests as f64 / elapsed.as_secs_f64();

    let final_balance = store
        .card(card.id)
        .await
        .map(|c| c.balance.value())
        .ok_or_else(|| anyhow::anyhow!("card disappeared during the run"))?;
    let rows = store.transactions().await;
    let successful_rows = rows
        .iter()
        .filter(|r| r.operation_result == OperationResult::Successfully)
        .count() as u64;

    println!("\n=== Load Test Results ===");
    println!("Total requests: {}", requests);
    println!("Successful: {}", success_count);
    println!("Ledger rows: {}", rows.len());
    println!("Final balance: {}", final_balance);
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Rate: {:.0} requests/sec", rate);

    let expected = balance - amount.value() * Decimal::from(success_count);
    anyhow::ensure!(final_balance >= Decimal::ZERO, "balance went negative");
    anyhow::ensure!(final_balance == expected, "balance {} != expected {}", final_balance, expected);
    anyhow::ensure!(rows.len() as u64 == requests, "missing ledger rows");
    anyhow::ensure!(successful_rows == success_count, "ledger disagrees with responses");

    println!("Invariants hold");
    Ok(())
}
