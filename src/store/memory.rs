//! In-memory store
//!
//! All units of work are serialised through one async mutex held for the
//! lifetime of the unit. Writes go to a staged copy of the state that
//! replaces the shared state on commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::{BlockRequest, Card, CardStatus, Limit, TransactionRecord, User};

use super::{Store, StoreResult, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    cards: HashMap<Uuid, Card>,
    transactions: Vec<TransactionRecord>,
    block_requests: Vec<BlockRequest>,
}

impl MemoryState {
    fn owner_id(&self, username: &str) -> Option<Uuid> {
        self.users
            .values()
            .find(|u| u.username == username)
            .map(|u| u.id)
    }
}

/// Process-local store for tests and development runs
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user
    pub async fn insert_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }

    /// Seed a card as is, bypassing issuance rules
    pub async fn insert_card(&self, card: Card) {
        self.state.lock().await.cards.insert(card.id, card);
    }

    pub async fn card(&self, card_id: Uuid) -> Option<Card> {
        self.state.lock().await.cards.get(&card_id).cloned()
    }

    /// Ledger rows in insertion order
    pub async fn transactions(&self) -> Vec<TransactionRecord> {
        self.state.lock().await.transactions.clone()
    }

    /// Block requests in insertion order
    pub async fn block_requests(&self) -> Vec<BlockRequest> {
        self.state.lock().await.block_requests.clone()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> StoreResult<MemoryUnit> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryUnit { guard, staged })
    }
}

/// Unit of work holding the store lock
pub struct MemoryUnit {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

impl MemoryUnit {
    fn owned_card(&self, username: &str, matches: impl Fn(&Card) -> bool) -> Option<Card> {
        let owner = self.staged.owner_id(username)?;
        self.staged
            .cards
            .values()
            .find(|c| c.user_id == owner && matches(c))
            .cloned()
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn find_user(&mut self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.staged.users.get(&user_id).cloned())
    }

    async fn lock_card_by_owner_and_number(
        &mut self,
        username: &str,
        number: &str,
    ) -> StoreResult<Option<Card>> {
        Ok(self.owned_card(username, |c| c.number == number))
    }

    async fn lock_card_by_owner_and_id(
        &mut self,
        username: &str,
        card_id: Uuid,
    ) -> StoreResult<Option<Card>> {
        Ok(self.owned_card(username, |c| c.id == card_id))
    }

    async fn lock_card(&mut self, card_id: Uuid) -> StoreResult<Option<Card>> {
        Ok(self.staged.cards.get(&card_id).cloned())
    }

    async fn card_exists(&mut self, card_id: Uuid) -> StoreResult<bool> {
        Ok(self.staged.cards.contains_key(&card_id))
    }

    async fn card_number_exists(&mut self, number: &str) -> StoreResult<bool> {
        Ok(self.staged.cards.values().any(|c| c.number == number))
    }

    async fn insert_card(&mut self, card: &Card) -> StoreResult<()> {
        self.staged.cards.insert(card.id, card.clone());
        Ok(())
    }

    async fn save_card(&mut self, card: &Card) -> StoreResult<()> {
        if let Some(stored) = self.staged.cards.get_mut(&card.id) {
            stored.balance = card.balance;
            stored.status = card.status;
        }
        Ok(())
    }

    async fn set_card_status(&mut self, card_id: Uuid, status: CardStatus) -> StoreResult<()> {
        if let Some(stored) = self.staged.cards.get_mut(&card_id) {
            stored.status = status;
        }
        Ok(())
    }

    async fn save_limit(&mut self, card_id: Uuid, limit: &Limit) -> StoreResult<()> {
        if let Some(stored) = self.staged.cards.get_mut(&card_id) {
            stored.limit = limit.clone();
        }
        Ok(())
    }

    async fn delete_card(&mut self, card_id: Uuid) -> StoreResult<()> {
        self.staged
            .transactions
            .retain(|t| t.card_id != card_id && t.target_card_id != Some(card_id));
        self.staged.block_requests.retain(|r| r.card_id != card_id);
        self.staged.cards.remove(&card_id);
        Ok(())
    }

    async fn withdrawal_sum(
        &mut self,
        card_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Option<Decimal>> {
        let sum = self
            .staged
            .transactions
            .iter()
            .filter(|t| t.card_id == card_id && t.is_successful_withdrawal())
            .filter(|t| t.timestamp >= from && t.timestamp < to)
            .map(|t| t.amount)
            .reduce(|acc, amount| acc + amount);

        Ok(sum)
    }

    async fn append_transaction(&mut self, record: &TransactionRecord) -> StoreResult<()> {
        self.staged.transactions.push(record.clone());
        Ok(())
    }

    async fn latest_block_request(&mut self, card_id: Uuid) -> StoreResult<Option<BlockRequest>> {
        Ok(self
            .staged
            .block_requests
            .iter()
            .filter(|r| r.card_id == card_id)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn lock_block_request(&mut self, request_id: Uuid) -> StoreResult<Option<BlockRequest>> {
        Ok(self
            .staged
            .block_requests
            .iter()
            .find(|r| r.id == request_id)
            .cloned())
    }

    async fn save_block_request(&mut self, request: &BlockRequest) -> StoreResult<()> {
        match self
            .staged
            .block_requests
            .iter_mut()
            .find(|r| r.id == request.id)
        {
            Some(stored) => *stored = request.clone(),
            None => self.staged.block_requests.push(request.clone()),
        }
        Ok(())
    }

    async fn commit(mut self) -> StoreResult<()> {
        *self.guard = self.staged;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}
