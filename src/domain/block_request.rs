//! Block requests
//!
//! A user asks for one of their cards to be blocked; an operator later
//! completes or rejects the request. Only the newest request of a card
//! governs the cooldown between requests.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::card::Card;
use super::error::DomainError;

/// Minimum spacing between two block requests on the same card
pub const BLOCK_REQUEST_COOLDOWN_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockStatus {
    Created,
    Completed,
    Rejected,
}

impl BlockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockStatus::Created => "CREATED",
            BlockStatus::Completed => "COMPLETED",
            BlockStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(BlockStatus::Created),
            "COMPLETED" => Ok(BlockStatus::Completed),
            "REJECTED" => Ok(BlockStatus::Rejected),
            other => Err(DomainError::InvalidStatusValue(other.to_string())),
        }
    }
}

/// Operator decision on a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockDecision {
    Completed,
    Rejected,
}

impl From<BlockDecision> for BlockStatus {
    fn from(decision: BlockDecision) -> Self {
        match decision {
            BlockDecision::Completed => BlockStatus::Completed,
            BlockDecision::Rejected => BlockStatus::Rejected,
        }
    }
}

impl FromStr for BlockDecision {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(BlockDecision::Completed),
            "REJECTED" => Ok(BlockDecision::Rejected),
            other => Err(DomainError::InvalidStatusValue(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRequest {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: BlockStatus,
    pub user_id: Uuid,
    pub card_id: Uuid,
}

impl BlockRequest {
    /// Open a new request on behalf of the card's owner
    pub fn open(card: &Card, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            status: BlockStatus::Created,
            user_id: card.user_id,
            card_id: card.id,
        }
    }

    pub fn cooldown_ends_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::days(BLOCK_REQUEST_COOLDOWN_DAYS)
    }

    /// Whether this request still prevents a new one on the same card at `now`
    pub fn blocks_new_request_at(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_ends_at() > now
    }

    /// Move a CREATED request to its terminal status.
    ///
    /// A request that already left CREATED cannot be resolved again.
    pub fn resolve(&mut self, decision: BlockDecision, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != BlockStatus::Created {
            return Err(DomainError::BlockRequestAlreadyResolved {
                id: self.id,
                status: self.status,
            });
        }

        self.status = decision.into();
        self.updated_at = now;
        Ok(())
    }
}
