//! Block Request Handler
//!
//! Users open block requests on their cards; operators complete or reject them.
//! Completing a request blocks the card.

use tracing::info;

use crate::domain::{BlockDecision, BlockRequest, CardEvent, CardStatus, Clock, DomainError, SharedClock};
use crate::error::AppError;
use crate::store::{Store, UnitOfWork};

use super::{BlockRequestView, CreateBlockRequestCommand, UpdateBlockRequestStatusCommand};

pub struct BlockRequestHandler<S: Store> {
    store: S,
    clock: SharedClock,
}

impl<S: Store> BlockRequestHandler<S> {
    pub fn new(store: S, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Open a block request, unless the card is already blocked or its latest
    /// request is still inside the cooldown period
    pub async fn create(&self, command: CreateBlockRequestCommand) -> Result<BlockRequestView, AppError> {
        let now = self.clock.now();
        let mut unit = self.store.begin().await?;

        let Some(card) = unit
            .lock_card_by_owner_and_id(&command.username, command.card_id)
            .await?
        else {
            unit.rollback().await?;
            return Err(DomainError::CardNotFound(command.card_id.to_string()).into());
        };

        if card.status == CardStatus::Blocked {
            unit.rollback().await?;
            return Err(DomainError::CardAlreadyBlocked { card_id: card.id }.into());
        }

        if let Some(latest) = unit.latest_block_request(card.id).await? {
            if latest.blocks_new_request_at(now) {
                unit.rollback().await?;
                return Err(DomainError::BlockRequestCooldown {
                    card_id: card.id,
                    available_at: latest.cooldown_ends_at(),
                }
                .into());
            }
        }

        let request = BlockRequest::open(&card, now);
        unit.save_block_request(&request).await?;
        unit.commit().await?;

        info!(request_id = %request.id, card_id = %card.id, "Block request created");

        Ok(BlockRequestView::from(&request))
    }

    /// Resolve a pending request; COMPLETED also blocks the card
    pub async fn update_status(
        &self,
        command: UpdateBlockRequestStatusCommand,
    ) -> Result<BlockRequestView, AppError> {
        let now = self.clock.now();
        let mut unit = self.store.begin().await?;

        let Some(mut request) = unit.lock_block_request(command.request_id).await? else {
            unit.rollback().await?;
            return Err(DomainError::BlockRequestNotFound(command.request_id).into());
        };

        if let Err(e) = request.resolve(command.decision, now) {
            unit.rollback().await?;
            return Err(e.into());
        }
        unit.save_block_request(&request).await?;

        if command.decision == BlockDecision::Completed {
            let Some(mut card) = unit.lock_card(request.card_id).await? else {
                unit.rollback().await?;
                return Err(DomainError::CardNotFound(request.card_id.to_string()).into());
            };
            let status = card.apply(CardEvent::BlockApproved)?;
            unit.set_card_status(card.id, status).await?;
        }

        unit.commit().await?;

        info!(
            request_id = %request.id,
            card_id = %request.card_id,
            status = %request.status,
            "Block request resolved"
        );

        Ok(BlockRequestView::from(&request))
    }
}
