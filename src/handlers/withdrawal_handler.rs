//! Withdrawal Handler
//!
//! Debits one of the caller's cards after status, balance and limit checks.

use crate::domain::{Clock, DomainError, OperationKind, OperationResult, SharedClock, TransactionRecord};
use crate::error::AppError;
use crate::store::{Store, UnitOfWork};
use crate::validation::{self, CardValidator};

use super::{WithdrawalCommand, WithdrawalResult};

/// Handler for card withdrawals
pub struct WithdrawalHandler<S: Store> {
    store: S,
    clock: SharedClock,
}

impl<S: Store> WithdrawalHandler<S> {
    pub fn new(store: S, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Execute the withdrawal command
    pub async fn execute(&self, command: WithdrawalCommand) -> Result<WithdrawalResult, AppError> {
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
        let totals = validation::withdrawal_totals(&mut unit, card.id, self.clock.as_ref()).await?;

        let checks = validator
            .check_status(&card, &amount, OperationKind::Withdrawal)
            .and_then(|_| validator.check_balance(&card, None, &amount, OperationKind::Withdrawal))
            .and_then(|_| {
                validator.check_limits(&card, &totals, &amount, OperationKind::Withdrawal)
            });
        if let Err(rejection) = checks {
            return Err(validation::reject(&self.store, unit, rejection).await);
        }

        let now = self.clock.now();
        card.balance = card.balance.debit(&amount).map_err(DomainError::from)?;
        unit.save_card(&card).await?;
        unit.append_transaction(&TransactionRecord::single(
            card.id,
            amount.value(),
            OperationKind::Withdrawal,
            OperationResult::Successfully,
            now,
        ))
        .await?;
        unit.commit().await?;

        tracing::info!(
            card_id = %card.id,
            amount = %amount,
            balance = %card.balance,
            "Withdrawal completed"
        );

        Ok(WithdrawalResult {
            card_id: card.id,
            number: card.masked_number(),
            withdrawal_amount: amount.value(),
            remaining_balance: card.balance.value(),
            transfer_time: now,
            user_id: card.user_id,
        })
    }
}
