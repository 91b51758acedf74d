//! Postgres store
//!
//! One unit of work is one database transaction. Cards are locked with
//! `SELECT ... FOR UPDATE OF c`, so concurrent operations on the same card
//! queue behind each other until the holder commits or rolls back.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{
    Balance, BlockRequest, BlockStatus, Card, CardStatus, Limit, OperationKind, OperationResult,
    TransactionRecord, User,
};

use super::{Store, StoreError, StoreResult, UnitOfWork};

/// Columns selected for a card joined with its limit
const CARD_COLUMNS: &str = r#"
    c.id, c.number, c.balance, c.status, c.expiration_date, c.user_id,
    l.daily_limit, l.monthly_limit, l.updated_at
"#;

type CardRow = (
    Uuid,
    String,
    Decimal,
    String,
    NaiveDate,
    Uuid,
    Decimal,
    Decimal,
    DateTime<Utc>,
);

type BlockRequestRow = (Uuid, DateTime<Utc>, DateTime<Utc>, String, Uuid, Uuid);

fn card_from_row(row: CardRow) -> StoreResult<Card> {
    let (id, number, balance, status, expiration_date, user_id, daily, monthly, updated_at) = row;

    Ok(Card {
        id,
        number,
        balance: Balance::new(balance).map_err(|e| StoreError::corrupted("cards", e))?,
        status: status
            .parse::<CardStatus>()
            .map_err(|e| StoreError::corrupted("cards", e))?,
        expiration_date,
        user_id,
        limit: Limit {
            daily_limit: daily,
            monthly_limit: monthly,
            updated_at,
        },
    })
}

fn block_request_from_row(row: BlockRequestRow) -> StoreResult<BlockRequest> {
    let (id, created_at, updated_at, status, user_id, card_id) = row;

    Ok(BlockRequest {
        id,
        created_at,
        updated_at,
        status: status
            .parse::<BlockStatus>()
            .map_err(|e| StoreError::corrupted("block_requests", e))?,
        user_id,
        card_id,
    })
}

/// Postgres-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    type Unit = PgUnit;

    async fn begin(&self) -> StoreResult<PgUnit> {
        let tx = self.pool.begin().await?;
        Ok(PgUnit { tx })
    }
}

/// Unit of work over an open Postgres transaction
pub struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

impl PgUnit {
    async fn fetch_card(&mut self, filter: &str, binds: CardFilter<'_>) -> StoreResult<Option<Card>> {
        let sql = format!(
            r#"
            SELECT {CARD_COLUMNS}
            FROM cards c
            JOIN card_limits l ON l.card_id = c.id
            JOIN users u ON u.id = c.user_id
            WHERE {filter}
            FOR UPDATE OF c
            "#
        );

        let query = sqlx::query_as::<_, CardRow>(&sql);
        let query = match binds {
            CardFilter::Id(id) => query.bind(id),
            CardFilter::OwnerAndNumber(username, number) => query.bind(username).bind(number),
            CardFilter::OwnerAndId(username, id) => query.bind(username).bind(id),
        };

        query
            .fetch_optional(&mut *self.tx)
            .await?
            .map(card_from_row)
            .transpose()
    }
}

enum CardFilter<'a> {
    Id(Uuid),
    OwnerAndNumber(&'a str, &'a str),
    OwnerAndId(&'a str, Uuid),
}

#[async_trait]
impl UnitOfWork for PgUnit {
    async fn find_user(&mut self, user_id: Uuid) -> StoreResult<Option<User>> {
        let row: Option<(Uuid, String)> =
            sqlx::query_as("SELECT id, username FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&mut *self.tx)
                .await?;

        Ok(row.map(|(id, username)| User { id, username }))
    }

    async fn lock_card_by_owner_and_number(
        &mut self,
        username: &str,
        number: &str,
    ) -> StoreResult<Option<Card>> {
        self.fetch_card(
            "u.username = $1 AND c.number = $2",
            CardFilter::OwnerAndNumber(username, number),
        )
        .await
    }

    async fn lock_card_by_owner_and_id(
        &mut self,
        username: &str,
        card_id: Uuid,
    ) -> StoreResult<Option<Card>> {
        self.fetch_card(
            "u.username = $1 AND c.id = $2",
            CardFilter::OwnerAndId(username, card_id),
        )
        .await
    }

    async fn lock_card(&mut self, card_id: Uuid) -> StoreResult<Option<Card>> {
        self.fetch_card("c.id = $1", CardFilter::Id(card_id)).await
    }

    async fn card_exists(&mut self, card_id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM cards WHERE id = $1)")
            .bind(card_id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(exists)
    }

    async fn card_number_exists(&mut self, number: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM cards WHERE number = $1)")
                .bind(number)
                .fetch_one(&mut *self.tx)
                .await?;

        Ok(exists)
    }

    async fn insert_card(&mut self, card: &Card) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cards (id, number, balance, status, expiration_date, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(card.id)
        .bind(&card.number)
        .bind(card.balance.value())
        .bind(card.status.as_str())
        .bind(card.expiration_date)
        .bind(card.user_id)
        .execute(&mut *self.tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO card_limits (card_id, daily_limit, monthly_limit, updated_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(card.id)
        .bind(card.limit.daily_limit)
        .bind(card.limit.monthly_limit)
        .bind(card.limit.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn save_card(&mut self, card: &Card) -> StoreResult<()> {
        sqlx::query("UPDATE cards SET balance = $2, status = $3 WHERE id = $1")
            .bind(card.id)
            .bind(card.balance.value())
            .bind(card.status.as_str())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn set_card_status(&mut self, card_id: Uuid, status: CardStatus) -> StoreResult<()> {
        sqlx::query("UPDATE cards SET status = $2 WHERE id = $1")
            .bind(card_id)
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn save_limit(&mut self, card_id: Uuid, limit: &Limit) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE card_limits
            SET daily_limit = $2, monthly_limit = $3, updated_at = $4
            WHERE card_id = $1
            "#,
        )
        .bind(card_id)
        .bind(limit.daily_limit)
        .bind(limit.monthly_limit)
        .bind(limit.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_card(&mut self, card_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM transactions WHERE card_id = $1 OR target_card_id = $1")
            .bind(card_id)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("DELETE FROM block_requests WHERE card_id = $1")
            .bind(card_id)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("DELETE FROM card_limits WHERE card_id = $1")
            .bind(card_id)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(card_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn withdrawal_sum(
        &mut self,
        card_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Option<Decimal>> {
        let sum: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT SUM(amount) FROM transactions
            WHERE card_id = $1
              AND operation = $2
              AND operation_result = $3
              AND timestamp >= $4
              AND timestamp < $5
            "#,
        )
        .bind(card_id)
        .bind(OperationKind::Withdrawal.as_str())
        .bind(OperationResult::Successfully.as_str())
        .bind(from)
        .bind(to)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(sum)
    }

    async fn append_transaction(&mut self, record: &TransactionRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, card_id, target_card_id, amount,
                operation, operation_result, timestamp
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.card_id)
        .bind(record.target_card_id)
        .bind(record.amount)
        .bind(record.operation.as_str())
        .bind(record.operation_result.as_str())
        .bind(record.timestamp)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn latest_block_request(&mut self, card_id: Uuid) -> StoreResult<Option<BlockRequest>> {
        let row: Option<BlockRequestRow> = sqlx::query_as(
            r#"
            SELECT id, created_at, updated_at, status, user_id, card_id
            FROM block_requests
            WHERE card_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(card_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(block_request_from_row).transpose()
    }

    async fn lock_block_request(&mut self, request_id: Uuid) -> StoreResult<Option<BlockRequest>> {
        let row: Option<BlockRequestRow> = sqlx::query_as(
            r#"
            SELECT id, created_at, updated_at, status, user_id, card_id
            FROM block_requests
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(request_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(block_request_from_row).transpose()
    }

    async fn save_block_request(&mut self, request: &BlockRequest) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO block_requests (id, created_at, updated_at, status, user_id, card_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(request.id)
        .bind(request.created_at)
        .bind(request.updated_at)
        .bind(request.status.as_str())
        .bind(request.user_id)
        .bind(request.card_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
