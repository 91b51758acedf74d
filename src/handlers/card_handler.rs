//! Card Handler
//!
//! Administrative card operations: issuing, status changes, deletion and
//! spending limit updates.

use chrono::Months;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Card, CardEvent, Clock, DomainError, SharedClock};
use crate::error::AppError;
use crate::store::{Store, UnitOfWork};

use super::{CardView, IssueCardCommand, LimitView, UpdateCardStatusCommand, UpdateLimitCommand};

pub struct CardHandler<S: Store> {
    store: S,
    clock: SharedClock,
    validity_years: u32,
}

impl<S: Store> CardHandler<S> {
    pub fn new(store: S, clock: SharedClock, validity_years: u32) -> Self {
        Self {
            store,
            clock,
            validity_years,
        }
    }

    /// Issue an ACTIVE card with zero balance and zero limits
    pub async fn issue(&self, command: IssueCardCommand) -> Result<CardView, AppError> {
        let expiration_date = match command.expiration_date {
            Some(date) => date,
            None => self
                .clock
                .today()
                .checked_add_months(Months::new(self.validity_years.saturating_mul(12)))
                .ok_or_else(|| AppError::Internal("card expiration date out of range".to_string()))?,
        };

        let mut unit = self.store.begin().await?;

        if unit.find_user(command.user_id).await?.is_none() {
            unit.rollback().await?;
            return Err(DomainError::UserNotFound(command.user_id.to_string()).into());
        }

        if unit.card_number_exists(&command.number).await? {
            unit.rollback().await?;
            return Err(DomainError::CardAlreadyExists(command.number).into());
        }

        let card = Card::issue(command.user_id, command.number, expiration_date, self.clock.now());
        unit.insert_card(&card).await?;
        unit.commit().await?;

        info!(card_id = %card.id, user_id = %card.user_id, "Card issued");

        Ok(CardView::from(&card))
    }

    pub async fn update_status(&self, command: UpdateCardStatusCommand) -> Result<CardView, AppError> {
        let mut unit = self.store.begin().await?;

        let Some(mut card) = unit.lock_card(command.card_id).await? else {
            unit.rollback().await?;
            return Err(DomainError::CardNotFound(command.card_id.to_string()).into());
        };

        let previous = card.status;
        if let Err(e) = card.apply(CardEvent::AdminSet(command.status)) {
            unit.rollback().await?;
            return Err(e.into());
        }
        unit.set_card_status(card.id, card.status).await?;
        unit.commit().await?;

        info!(card_id = %card.id, from = %previous, to = %card.status, "Card status updated");

        Ok(CardView::from(&card))
    }

    /// Delete a card with its limit, block requests and ledger rows
    pub async fn delete(&self, card_id: Uuid) -> Result<(), AppError> {
        let mut unit = self.store.begin().await?;

        if !unit.card_exists(card_id).await? {
            unit.rollback().await?;
            return Err(DomainError::CardNotFound(card_id.to_string()).into());
        }

        unit.delete_card(card_id).await?;
        unit.commit().await?;

        info!(card_id = %card_id, "Card deleted");
        Ok(())
    }

    pub async fn update_limit(&self, command: UpdateLimitCommand) -> Result<LimitView, AppError> {
        if command.value < Decimal::ZERO {
            return Err(DomainError::InvalidAmount(format!(
                "{} limit must not be negative (got {})",
                command.period, command.value
            ))
            .into());
        }

        let mut unit = self.store.begin().await?;

        let Some(mut card) = unit.lock_card(command.card_id).await? else {
            unit.rollback().await?;
            return Err(DomainError::LimitNotFound(command.card_id).into());
        };

        card.limit.set(command.period, command.value, self.clock.now());
        unit.save_limit(card.id, &card.limit).await?;
        unit.commit().await?;

        info!(
            card_id = %card.id,
            period = %command.period,
            limit = %command.value,
            "Card limit updated"
        );

        Ok(LimitView::new(card.id, &card.limit))
    }
}
