//! Transfer Handler
//!
//! Moves funds between two cards owned by the caller.

use crate::domain::{Amount, Card, Clock, DomainError, OperationKind, OperationResult, SharedClock, TransactionRecord};
use crate::error::AppError;
use crate::store::{Store, StoreResult, UnitOfWork};
use crate::validation::{self, CardValidator, Rejection};

use super::{TransferCommand, TransferResult};

/// Handler for card-to-card transfers
pub struct TransferHandler<S: Store> {
    store: S,
    clock: SharedClock,
}

impl<S: Store> TransferHandler<S> {
    pub fn new(store: S, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Execute the transfer command
    pub async fn execute(&self, command: TransferCommand) -> Result<TransferResult, AppError> {
        let amount = command.amount.clone();
        let mut unit = self.store.begin().await?;

        let (source, target) = lock_pair(&mut unit, &command).await?;

        let Some(mut source) = source else {
            unit.rollback().await?;
            return Err(DomainError::CardNotFound(command.number).into());
        };

        let validator = CardValidator::new(self.clock.as_ref());
        if let Err(rejection) = validator.check_status(&source, &amount, OperationKind::Transfer) {
            return Err(validation::reject(&self.store, unit, rejection).await);
        }

        let Some(mut target) = target else {
            unit.rollback().await?;
            return Err(DomainError::CardNotFound(command.target_number).into());
        };

        if let Err(rejection) = check_pair(&validator, &source, &target, &amount) {
            return Err(validation::reject(&self.store, unit, rejection).await);
        }

        let now = self.clock.now();
        source.balance = source.balance.debit(&amount).map_err(DomainError::from)?;
        target.balance = target.balance.credit(&amount).map_err(DomainError::from)?;

        unit.save_card(&source).await?;
        unit.save_card(&target).await?;
        unit.append_transaction(&TransactionRecord::between(
            source.id,
            target.id,
            amount.value(),
            OperationResult::Successfully,
            now,
        ))
        .await?;
        unit.commit().await?;

        tracing::info!(
            card_id = %source.id,
            target_card_id = %target.id,
            amount = %amount,
            balance = %source.balance,
            target_balance = %target.balance,
            "Transfer completed"
        );

        Ok(TransferResult {
            card_id: source.id,
            target_card_id: target.id,
            number: source.masked_number(),
            target_number: target.masked_number(),
            balance: source.balance.value(),
            transfer_amount: amount.value(),
            transfer_time: now,
            user_id: source.user_id,
        })
    }
}

/// Lock source and target in ascending card-number order so that opposite
/// transfers between the same two cards cannot deadlock.
async fn lock_pair<U: UnitOfWork>(
    unit: &mut U,
    command: &TransferCommand,
) -> StoreResult<(Option<Card>, Option<Card>)> {
    let username = command.username.as_str();

    if command.number == command.target_number {
        let card = unit
            .lock_card_by_owner_and_number(username, &command.number)
            .await?;
        return Ok((card.clone(), card));
    }

    if command.number < command.target_number {
        let source = unit.lock_card_by_owner_and_number(username, &command.number).await?;
        let target = unit
            .lock_card_by_owner_and_number(username, &command.target_number)
            .await?;
        Ok((source, target))
    } else {
        let target = unit
            .lock_card_by_owner_and_number(username, &command.target_number)
            .await?;
        let source = unit.lock_card_by_owner_and_number(username, &command.number).await?;
        Ok((source, target))
    }
}

/// Target status, distinct cards, source balance, then target headroom
fn check_pair(
    validator: &CardValidator<'_>,
    source: &Card,
    target: &Card,
    amount: &Amount,
) -> Result<(), Rejection> {
    validator.check_status(target, amount, OperationKind::Transfer)?;
    validator.check_distinct(source, target, amount)?;
    validator.check_balance(source, Some(target), amount, OperationKind::Transfer)?;
    validator.check_credit(target, Some(source), amount, OperationKind::Transfer)
}
