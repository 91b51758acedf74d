//! Transaction records
//!
//! Every funds operation attempt that reaches a loaded card leaves exactly one
//! record, successful or not.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::error::DomainError;

/// Kind of funds operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Withdrawal,
    Recharge,
    Transfer,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Withdrawal => "WITHDRAWAL",
            OperationKind::Recharge => "RECHARGE",
            OperationKind::Transfer => "TRANSFER",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WITHDRAWAL" => Ok(OperationKind::Withdrawal),
            "RECHARGE" => Ok(OperationKind::Recharge),
            "TRANSFER" => Ok(OperationKind::Transfer),
            other => Err(DomainError::InvalidStatusValue(other.to_string())),
        }
    }
}

/// Outcome recorded for an operation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationResult {
    Successfully,
    Failed,
    CardBlocked,
    CardExpired,
}

impl OperationResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationResult::Successfully => "SUCCESSFULLY",
            OperationResult::Failed => "FAILED",
            OperationResult::CardBlocked => "CARD_BLOCKED",
            OperationResult::CardExpired => "CARD_EXPIRED",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Successfully)
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationResult {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESSFULLY" => Ok(OperationResult::Successfully),
            "FAILED" => Ok(OperationResult::Failed),
            "CARD_BLOCKED" => Ok(OperationResult::CardBlocked),
            "CARD_EXPIRED" => Ok(OperationResult::CardExpired),
            other => Err(DomainError::InvalidStatusValue(other.to_string())),
        }
    }
}

/// Append-only record of one operation attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub card_id: Uuid,
    /// Set only for transfers
    pub target_card_id: Option<Uuid>,
    pub amount: Decimal,
    pub operation: OperationKind,
    pub operation_result: OperationResult,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    /// Record for a single-card operation (withdrawal or recharge)
    pub fn single(
        card_id: Uuid,
        amount: Decimal,
        operation: OperationKind,
        operation_result: OperationResult,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id,
            target_card_id: None,
            amount,
            operation,
            operation_result,
            timestamp,
        }
    }

    /// Record for a transfer from `card_id` to `target_card_id`
    pub fn between(
        card_id: Uuid,
        target_card_id: Uuid,
        amount: Decimal,
        operation_result: OperationResult,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id,
            target_card_id: Some(target_card_id),
            amount,
            operation: OperationKind::Transfer,
            operation_result,
            timestamp,
        }
    }

    /// Whether this record counts towards spending limits
    pub fn is_successful_withdrawal(&self) -> bool {
        self.operation == OperationKind::Withdrawal && self.operation_result.is_success()
    }
}
