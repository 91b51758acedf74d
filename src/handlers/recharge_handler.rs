//! Recharge Handler
//!
//! Credits one of the caller's cards. Only the card status and the maximum
//! balance are checked; deposits are never limited by spending caps.

use crate::domain::{Clock, DomainError, OperationKind, OperationResult, SharedClock, TransactionRecord};
use crate::error::AppError;
use crate::store::{Store, UnitOfWork};
use crate::validation::{self, CardValidator};

use super::{RechargeCommand, RechargeResult};

pub struct RechargeHandler<S: Store> {
    store: S,
    clock: SharedClock,
}

impl<S: Store> RechargeHandler<S> {
    pub fn new(store: S, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    pub async fn execute(&self, command: RechargeCommand) -> Result<RechargeResult, AppError> {
        let amount = command.amount;
        let mut unit = self.store.begin().await?;

        let Some(mut card) = unit
            .lock_card_by_owner_and_number(&command.username, &command.number)
            .await?
        else {
            unit.rollback().await?;
            return Err(DomainError::CardNotFound(command.number).into());
        };

        let validator = CardValidator::new(self.clock.as_ref());
        let checks = validator
            .check_status(&card, &amount, OperationKind::Recharge)
            .and_then(|_| validator.check_credit(&card, None, &amount, OperationKind::Recharge));
        if let Err(rejection) = checks {
            return Err(validation::reject(&self.store, unit, rejection).await);
        }

        let now = self.clock.now();
        card.balance = card.balance.credit(&amount).map_err(DomainError::from)?;
        unit.save_card(&card).await?;
        unit.append_transaction(&TransactionRecord::single(
            card.id,
            amount.value(),
            OperationKind::Recharge,
            OperationResult::Successfully,
            now,
        ))
        .await?;
        unit.commit().await?;

        tracing::info!(
            card_id = %card.id,
            amount = %amount,
            balance = %card.balance,
            "Recharge completed"
        );

        Ok(RechargeResult {
            card_id: card.id,
            number: card.masked_number(),
            recharge_amount: amount.value(),
            balance: card.balance.value(),
            transfer_time: now,
            user_id: card.user_id,
        })
    }
}
