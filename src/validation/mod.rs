//! Card validation pipeline
//!
//! Checks run in a fixed order: status, distinct cards (transfer), balance
//! (withdrawal and transfer), maximum balance of the credited card (recharge
//! and transfer), limits (withdrawal). The first failing check
//! produces a [`Rejection`] carrying the error and the ledger row to record.
//!
//! Recording happens in a unit of work separate from the one that attempted
//! the mutation: the attempt is rolled back, the failure row is committed.

pub mod input;

use uuid::Uuid;

use crate::domain::{
    self, Amount, Card, CardEvent, Clock, DomainError, LimitPeriod, LimitWindow, OperationKind,
    OperationResult, TransactionRecord, WithdrawalTotals,
};
use crate::error::AppError;
use crate::store::{Store, StoreResult, UnitOfWork};

/// A failed check, with everything needed to record it
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub error: DomainError,
    pub record: TransactionRecord,
    /// Card found past its expiration date that must be marked EXPIRED
    pub expire_card: Option<Uuid>,
}

impl Rejection {
    fn new(error: DomainError, record: TransactionRecord) -> Self {
        Self {
            error,
            record,
            expire_card: None,
        }
    }
}

pub struct CardValidator<'a> {
    clock: &'a dyn Clock,
}

impl<'a> CardValidator<'a> {
    pub fn new(clock: &'a dyn Clock) -> Self {
        Self { clock }
    }

    fn single(&self, card: &Card, amount: &Amount, operation: OperationKind, result: OperationResult) -> TransactionRecord {
        TransactionRecord::single(card.id, amount.value(), operation, result, self.clock.now())
    }

    /// Reject BLOCKED and EXPIRED cards, and cards whose expiration date is not
    /// after today. The last case also asks for the card to be marked EXPIRED.
    pub fn check_status(
        &self,
        card: &Card,
        amount: &Amount,
        operation: OperationKind,
    ) -> Result<(), Rejection> {
        use domain::CardStatus::*;

        let expired = DomainError::CardExpired {
            card_id: card.id,
            expiration_date: card.expiration_date,
        };

        match card.status {
            Blocked => Err(Rejection::new(
                DomainError::CardBlocked { card_id: card.id },
                self.single(card, amount, operation, OperationResult::CardBlocked),
            )),
            Expired => Err(Rejection::new(
                expired,
                self.single(card, amount, operation, OperationResult::CardExpired),
            )),
            Active if card.is_past_expiration(self.clock.today()) => {
                let healed = card.status.transition(CardEvent::AutoExpire).map_err(|error| {
                    Rejection::new(
                        error,
                        self.single(card, amount, operation, OperationResult::Failed),
                    )
                })?;

                let mut rejection = Rejection::new(
                    expired,
                    self.single(card, amount, operation, OperationResult::CardExpired),
                );
                if healed != card.status {
                    rejection.expire_card = Some(card.id);
                }
                Err(rejection)
            }
            Active => Ok(()),
        }
    }

    /// Transfers need two different cards
    pub fn check_distinct(&self, card: &Card, target: &Card, amount: &Amount) -> Result<(), Rejection> {
        if card.id == target.id {
            return Err(Rejection::new(
                DomainError::CardsAreTheSame {
                    amount: amount.value(),
                },
                self.single(card, amount, OperationKind::Transfer, OperationResult::Failed),
            ));
        }
        Ok(())
    }

    /// The debited card must cover the amount. A transfer failure row also
    /// references the target card.
    pub fn check_balance(
        &self,
        card: &Card,
        target: Option<&Card>,
        amount: &Amount,
        operation: OperationKind,
    ) -> Result<(), Rejection> {
        if card.balance.is_sufficient_for(amount) {
            return Ok(());
        }

        let record = match target {
            Some(target) => TransactionRecord::between(
                card.id,
                target.id,
                amount.value(),
                OperationResult::Failed,
                self.clock.now(),
            ),
            None => self.single(card, amount, operation, OperationResult::Failed),
        };

        Err(Rejection::new(
            DomainError::insufficient_balance(amount.value(), card.balance.value()),
            record,
        ))
    }

    /// The credited card must stay within the maximum balance. A transfer
    /// failure row references the debited card as its source.
    pub fn check_credit(
        &self,
        card: &Card,
        source: Option<&Card>,
        amount: &Amount,
        operation: OperationKind,
    ) -> Result<(), Rejection> {
        let Err(error) = card.balance.credit(amount) else {
            return Ok(());
        };

        let record = match source {
            Some(source) => TransactionRecord::between(
                source.id,
                card.id,
                amount.value(),
                OperationResult::Failed,
                self.clock.now(),
            ),
            None => self.single(card, amount, operation, OperationResult::Failed),
        };

        Err(Rejection::new(DomainError::from(error), record))
    }

    pub fn check_limits(
        &self,
        card: &Card,
        totals: &WithdrawalTotals,
        amount: &Amount,
        operation: OperationKind,
    ) -> Result<(), Rejection> {
        domain::check_limits(&card.limit, totals, amount).map_err(|error| {
            Rejection::new(
                error,
                self.single(card, amount, operation, OperationResult::Failed),
            )
        })
    }
}

/// Load today's and this month's successful withdrawal sums for a card
pub async fn withdrawal_totals<U: UnitOfWork>(
    unit: &mut U,
    card_id: Uuid,
    clock: &dyn Clock,
) -> StoreResult<WithdrawalTotals> {
    let window = LimitWindow::containing(clock.now(), clock.zone());

    let (from, to) = window.bounds(LimitPeriod::Daily);
    let today = unit.withdrawal_sum(card_id, from, to).await?;

    let (from, to) = window.bounds(LimitPeriod::Monthly);
    let this_month = unit.withdrawal_sum(card_id, from, to).await?;

    Ok(WithdrawalTotals::from_sums(today, this_month))
}

/// Discard the attempt held by `unit`, durably record the rejection in a new
/// unit of work, and return the error to hand back to the caller.
pub async fn reject<S: Store>(store: &S, unit: S::Unit, rejection: Rejection) -> AppError {
    match record_rejection(store, unit, &rejection).await {
        Ok(()) => {
            tracing::warn!(
                card_id = %rejection.record.card_id,
                operation = %rejection.record.operation,
                operation_result = %rejection.record.operation_result,
                amount = %rejection.record.amount,
                "{}",
                rejection.error
            );
            AppError::Domain(rejection.error)
        }
        Err(e) => e.into(),
    }
}

async fn record_rejection<S: Store>(store: &S, unit: S::Unit, rejection: &Rejection) -> StoreResult<()> {
    unit.rollback().await?;

    let mut unit = store.begin().await?;
    if let Some(card_id) = rejection.expire_card {
        unit.set_card_status(card_id, domain::CardStatus::Expired).await?;
    }
    unit.append_transaction(&rejection.record).await?;
    unit.commit().await
}
