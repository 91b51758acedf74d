//! Storage module
//!
//! Repository-style access to cards, limits, ledger rows and block requests.
//! Every operation runs inside a [`UnitOfWork`]: writes become visible only on
//! [`UnitOfWork::commit`], and a unit dropped without commit is discarded.
//!
//! Cards fetched through the `lock_*` methods stay locked against other units
//! until this unit commits or rolls back.

mod error;
pub mod memory;
pub mod postgres;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{BlockRequest, Card, CardStatus, Limit, TransactionRecord, User};

/// Entry point of a storage backend
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Unit: UnitOfWork;

    /// Open a new unit of work
    async fn begin(&self) -> StoreResult<Self::Unit>;
}

#[async_trait]
pub trait UnitOfWork: Send + Sized {
    // =========================================================================
    // Users
    // =========================================================================

    async fn find_user(&mut self, user_id: Uuid) -> StoreResult<Option<User>>;

    // =========================================================================
    // Cards
    // =========================================================================

    /// Lock a card owned by `username`, looked up by its number
    async fn lock_card_by_owner_and_number(
        &mut self,
        username: &str,
        number: &str,
    ) -> StoreResult<Option<Card>>;

    /// Lock a card owned by `username`, looked up by id
    async fn lock_card_by_owner_and_id(
        &mut self,
        username: &str,
        card_id: Uuid,
    ) -> StoreResult<Option<Card>>;

    /// Lock any card by id
    async fn lock_card(&mut self, card_id: Uuid) -> StoreResult<Option<Card>>;

    async fn card_exists(&mut self, card_id: Uuid) -> StoreResult<bool>;

    async fn card_number_exists(&mut self, number: &str) -> StoreResult<bool>;

    /// Insert a new card together with its limit
    async fn insert_card(&mut self, card: &Card) -> StoreResult<()>;

    /// Persist balance and status of an existing card
    async fn save_card(&mut self, card: &Card) -> StoreResult<()>;

    /// Persist only the status column
    async fn set_card_status(&mut self, card_id: Uuid, status: CardStatus) -> StoreResult<()>;

    async fn save_limit(&mut self, card_id: Uuid, limit: &Limit) -> StoreResult<()>;

    /// Delete a card along with its limit, block requests and ledger rows
    async fn delete_card(&mut self, card_id: Uuid) -> StoreResult<()>;

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Sum of successful withdrawals on the card in `[from, to)`, `None` if there are none
    async fn withdrawal_sum(
        &mut self,
        card_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Option<Decimal>>;

    async fn append_transaction(&mut self, record: &TransactionRecord) -> StoreResult<()>;

    // =========================================================================
    // Block requests
    // =========================================================================

    /// Most recently created request on the card
    async fn latest_block_request(&mut self, card_id: Uuid) -> StoreResult<Option<BlockRequest>>;

    async fn lock_block_request(&mut self, request_id: Uuid) -> StoreResult<Option<BlockRequest>>;

    /// Insert or update a request
    async fn save_block_request(&mut self, request: &BlockRequest) -> StoreResult<()>;

    // =========================================================================
    // Completion
    // =========================================================================

    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}
