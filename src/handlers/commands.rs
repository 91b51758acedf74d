//! Command definitions
//!
//! Commands carry already validated input into the handlers; results are the
//! views handed back to the caller. Card numbers in results are always masked.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Amount, BlockDecision, BlockRequest, BlockStatus, Card, CardStatus, Limit, LimitPeriod,
};

// =========================================================================
// Funds movement
// =========================================================================

/// Withdraw from one of the caller's cards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalCommand {
    pub username: String,
    pub number: String,
    pub amount: Amount,
}

impl WithdrawalCommand {
    pub fn new(username: impl Into<String>, number: impl Into<String>, amount: Amount) -> Self {
        Self {
            username: username.into(),
            number: number.into(),
            amount,
        }
    }
}

/// Top up one of the caller's cards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RechargeCommand {
    pub username: String,
    pub number: String,
    pub amount: Amount,
}

impl RechargeCommand {
    pub fn new(username: impl Into<String>, number: impl Into<String>, amount: Amount) -> Self {
        Self {
            username: username.into(),
            number: number.into(),
            amount,
        }
    }
}

/// Move funds between two cards of the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    pub username: String,
    pub number: String,
    pub target_number: String,
    pub amount: Amount,
}

impl TransferCommand {
    pub fn new(
        username: impl Into<String>,
        number: impl Into<String>,
        target_number: impl Into<String>,
        amount: Amount,
    ) -> Self {
        Self {
            username: username.into(),
            number: number.into(),
            target_number: target_number.into(),
            amount,
        }
    }
}

// =========================================================================
// Block requests
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlockRequestCommand {
    pub username: String,
    pub card_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBlockRequestStatusCommand {
    pub request_id: Uuid,
    pub decision: BlockDecision,
}

// =========================================================================
// Card administration
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueCardCommand {
    pub user_id: Uuid,
    pub number: String,
    /// Defaults to today plus the configured validity period
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCardStatusCommand {
    pub card_id: Uuid,
    pub status: CardStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateLimitCommand {
    pub card_id: Uuid,
    pub period: LimitPeriod,
    pub value: Decimal,
}

// =========================================================================
// Results
// =========================================================================

/// Result of a successful withdrawal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalResult {
    pub card_id: Uuid,
    pub number: String,
    pub withdrawal_amount: Decimal,
    pub remaining_balance: Decimal,
    pub transfer_time: DateTime<Utc>,
    pub user_id: Uuid,
}

/// Result of a successful recharge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RechargeResult {
    pub card_id: Uuid,
    pub number: String,
    pub recharge_amount: Decimal,
    pub balance: Decimal,
    pub transfer_time: DateTime<Utc>,
    pub user_id: Uuid,
}

/// Result of a successful transfer; `balance` is the source card's new balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    pub card_id: Uuid,
    pub target_card_id: Uuid,
    pub number: String,
    pub target_number: String,
    pub balance: Decimal,
    pub transfer_amount: Decimal,
    pub transfer_time: DateTime<Utc>,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRequestView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: BlockStatus,
    pub card_id: Uuid,
    pub user_id: Uuid,
}

impl From<&BlockRequest> for BlockRequestView {
    fn from(request: &BlockRequest) -> Self {
        Self {
            id: request.id,
            created_at: request.created_at,
            updated_at: request.updated_at,
            status: request.status,
            card_id: request.card_id,
            user_id: request.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardView {
    pub id: Uuid,
    pub number: String,
    pub balance: Decimal,
    pub status: CardStatus,
    pub expiration_date: NaiveDate,
    pub user_id: Uuid,
}

impl From<&Card> for CardView {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id,
            number: card.masked_number(),
            balance: card.balance.value(),
            status: card.status,
            expiration_date: card.expiration_date,
            user_id: card.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitView {
    pub card_id: Uuid,
    pub daily_limit: Decimal,
    pub monthly_limit: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl LimitView {
    pub fn new(card_id: Uuid, limit: &Limit) -> Self {
        Self {
            card_id,
            daily_limit: limit.daily_limit,
            monthly_limit: limit.monthly_limit,
            updated_at: limit.updated_at,
        }
    }
}
