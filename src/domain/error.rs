//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::amount::AmountError;
use super::block_request::BlockStatus;
use super::card::CardStatus;
use super::limit::LimitPeriod;

/// Business rule violations raised by the card core.
///
/// None of these are transient; callers must not retry them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("Card {0} wasn't found")]
    CardNotFound(String),

    #[error("User {0} wasn't found")]
    UserNotFound(String),

    #[error("Block request {0} wasn't found")]
    BlockRequestNotFound(Uuid),

    #[error("Limit wasn't found by card id {0}")]
    LimitNotFound(Uuid),

    #[error("Operation forbidden, card with id {card_id} was blocked")]
    CardBlocked { card_id: Uuid },

    #[error("Operation forbidden, card with id {card_id} was expired at {expiration_date}")]
    CardExpired {
        card_id: Uuid,
        expiration_date: NaiveDate,
    },

    #[error("Transfer on the same card: {amount}")]
    CardsAreTheSame { amount: Decimal },

    #[error("Amount {required} more than balance {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },

    #[error("Amount {amount} and {period} withdrawals {spent} more than {period} limit {limit}")]
    LimitExceeded {
        period: LimitPeriod,
        spent: Decimal,
        amount: Decimal,
        limit: Decimal,
    },

    #[error("Card with id {card_id} was already blocked")]
    CardAlreadyBlocked { card_id: Uuid },

    #[error("A new block request for card {card_id} can be created only after {available_at}")]
    BlockRequestCooldown {
        card_id: Uuid,
        available_at: DateTime<Utc>,
    },

    #[error("Block request {id} was already resolved with status {status}")]
    BlockRequestAlreadyResolved { id: Uuid, status: BlockStatus },

    #[error("Invalid status value: {0}")]
    InvalidStatusValue(String),

    #[error("Card status cannot change from {from} to {to}")]
    InvalidStatusTransition { from: CardStatus, to: CardStatus },

    #[error("Card with number {0} already exists")]
    CardAlreadyExists(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl DomainError {
    /// Create an insufficient balance error
    pub fn insufficient_balance(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientBalance {
            required,
            available,
        }
    }

    /// Check if the error reports a missing entity
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CardNotFound(_)
                | Self::UserNotFound(_)
                | Self::BlockRequestNotFound(_)
                | Self::LimitNotFound(_)
        )
    }

    /// Check if the error is a conflict with the current state of an entity
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::CardAlreadyBlocked { .. }
                | Self::BlockRequestCooldown { .. }
                | Self::BlockRequestAlreadyResolved { .. }
                | Self::InvalidStatusTransition { .. }
                | Self::CardAlreadyExists(_)
        )
    }
}

impl From<AmountError> for DomainError {
    fn from(err: AmountError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}
