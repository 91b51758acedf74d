//! Card entity
//!
//! A card holds a balance, a lifecycle status and an expiration date.
//! Status changes go through [`CardStatus::transition`], never by direct assignment
//! from outside this module.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::amount::Balance;
use super::error::DomainError;
use super::limit::Limit;

/// Card lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardStatus {
    Active,
    Blocked,
    Expired,
}

/// Events that may move a card to another status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardEvent {
    /// Validation found the expiration date in the past
    AutoExpire,
    /// An operator approved a block request for the card
    BlockApproved,
    /// An administrator set the status explicitly
    AdminSet(CardStatus),
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Active => "ACTIVE",
            CardStatus::Blocked => "BLOCKED",
            CardStatus::Expired => "EXPIRED",
        }
    }

    /// Compute the status that results from applying `event`.
    ///
    /// BLOCKED and EXPIRED never return to ACTIVE. Administrators may only
    /// set ACTIVE or BLOCKED.
    pub fn transition(self, event: CardEvent) -> Result<CardStatus, DomainError> {
        use CardStatus::*;

        match (self, event) {
            (Active, CardEvent::AutoExpire) => Ok(Expired),
            (current, CardEvent::AutoExpire) => Ok(current),
            (_, CardEvent::BlockApproved) => Ok(Blocked),
            (_, CardEvent::AdminSet(Expired)) => {
                Err(DomainError::InvalidStatusValue(Expired.as_str().to_string()))
            }
            (_, CardEvent::AdminSet(Blocked)) => Ok(Blocked),
            (Active, CardEvent::AdminSet(Active)) => Ok(Active),
            (from, CardEvent::AdminSet(Active)) => {
                Err(DomainError::InvalidStatusTransition { from, to: Active })
            }
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(CardStatus::Active),
            "BLOCKED" => Ok(CardStatus::Blocked),
            "EXPIRED" => Ok(CardStatus::Expired),
            other => Err(DomainError::InvalidStatusValue(other.to_string())),
        }
    }
}

/// Card entity with its one-to-one limit loaded alongside
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: Uuid,
    /// Full number, "dddd dddd dddd dddd". Never returned unmasked.
    pub number: String,
    pub balance: Balance,
    pub status: CardStatus,
    pub expiration_date: NaiveDate,
    pub user_id: Uuid,
    pub limit: Limit,
}

impl Card {
    /// Issue a new ACTIVE card with a zero balance and zero limits
    pub fn issue(
        user_id: Uuid,
        number: String,
        expiration_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            balance: Balance::zero(),
            status: CardStatus::Active,
            expiration_date,
            user_id,
            limit: Limit::fresh(now),
        }
    }

    /// The card is past its expiration unless the date is strictly after `today`
    pub fn is_past_expiration(&self, today: NaiveDate) -> bool {
        self.expiration_date <= today
    }

    /// Apply a lifecycle event to the card status
    pub fn apply(&mut self, event: CardEvent) -> Result<CardStatus, DomainError> {
        self.status = self.status.transition(event)?;
        Ok(self.status)
    }

    pub fn masked_number(&self) -> String {
        mask_card_number(&self.number)
    }
}

/// Number of trailing significant characters left visible by masking
const VISIBLE_DIGITS: usize = 4;

/// Replace every significant character except the last four with `*`.
///
/// Spaces are preserved, and masking an already masked number is a no-op.
pub fn mask_card_number(number: &str) -> String {
    let significant = number.chars().filter(|c| *c != ' ').count();
    let hidden = significant.saturating_sub(VISIBLE_DIGITS);

    let mut seen = 0;
    number
        .chars()
        .map(|c| {
            if c == ' ' {
                return c;
            }
            seen += 1;
            if seen <= hidden {
                '*'
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn card_expiring(expiration_date: NaiveDate) -> Card {
        Card::issue(
            Uuid::new_v4(),
            "1234 5678 9012 3456".to_string(),
            expiration_date,
            Utc::now(),
        )
    }

    #[test]
    fn test_mask_card_number() {
        assert_eq!(mask_card_number("1234 5678 9012 3456"), "**** **** **** 3456");
    }

    #[test]
    fn test_mask_short_number_untouched() {
        assert_eq!(mask_card_number("123"), "123");
    }

    #[test]
    fn test_issue_starts_active_with_zero_balance() {
        let card = card_expiring(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());

        assert_eq!(card.status, CardStatus::Active);
        assert!(card.balance.value().is_zero());
        assert!(card.limit.daily_limit.is_zero());
        assert!(card.limit.monthly_limit.is_zero());
        assert_eq!(card.masked_number(), "**** **** **** 3456");
    }

    #[test]
    fn test_expiration_is_strict() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();

        assert!(card_expiring(today).is_past_expiration(today));
        assert!(card_expiring(today.pred_opt().unwrap()).is_past_expiration(today));
        assert!(!card_expiring(today.succ_opt().unwrap()).is_past_expiration(today));
    }

    #[test]
    fn test_auto_expire_transitions() {
        assert_eq!(
            CardStatus::Active.transition(CardEvent::AutoExpire),
            Ok(CardStatus::Expired)
        );
        assert_eq!(
            CardStatus::Blocked.transition(CardEvent::AutoExpire),
            Ok(CardStatus::Blocked)
        );
    }

    #[test]
    fn test_block_approved_always_blocks() {
        for status in [CardStatus::Active, CardStatus::Blocked, CardStatus::Expired] {
            assert_eq!(
                status.transition(CardEvent::BlockApproved),
                Ok(CardStatus::Blocked)
            );
        }
    }

    #[test]
    fn test_admin_cannot_reactivate() {
        let result = CardStatus::Blocked.transition(CardEvent::AdminSet(CardStatus::Active));
        assert_eq!(
            result,
            Err(DomainError::InvalidStatusTransition {
                from: CardStatus::Blocked,
                to: CardStatus::Active,
            })
        );

        let result = CardStatus::Expired.transition(CardEvent::AdminSet(CardStatus::Active));
        assert!(matches!(result, Err(DomainError::InvalidStatusTransition { .. })));
    }

    #[test]
    fn test_admin_cannot_set_expired() {
        let result = CardStatus::Active.transition(CardEvent::AdminSet(CardStatus::Expired));
        assert!(matches!(result, Err(DomainError::InvalidStatusValue(_))));
    }

    #[test]
    fn test_card_apply_updates_status() {
        let mut card = card_expiring(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        assert_eq!(card.apply(CardEvent::AdminSet(CardStatus::Blocked)), Ok(CardStatus::Blocked));
        assert_eq!(card.status, CardStatus::Blocked);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        assert_eq!("BLOCKED".parse::<CardStatus>(), Ok(CardStatus::Blocked));
        assert!("blocked".parse::<CardStatus>().is_err());
    }

    proptest! {
        #[test]
        fn prop_masking_is_idempotent(groups in proptest::collection::vec("[0-9]{4}", 1..6)) {
            let number = groups.join(" ");
            let once = mask_card_number(&number);
            prop_assert_eq!(mask_card_number(&once), once.clone());
            prop_assert_eq!(once.len(), number.len());
        }
    }
}
