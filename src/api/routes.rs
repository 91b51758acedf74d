//! API Routes
//!
//! HTTP endpoint definitions. Request bodies are checked field by field before
//! a command reaches its handler.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, patch, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{LimitPeriod, SharedClock};
use crate::error::AppError;
use crate::handlers::{
    BlockRequestHandler, BlockRequestView, CardHandler, CardView, CreateBlockRequestCommand,
    IssueCardCommand, LimitView, RechargeCommand, RechargeHandler, RechargeResult,
    TransferCommand, TransferHandler, TransferResult, UpdateBlockRequestStatusCommand,
    UpdateCardStatusCommand, UpdateLimitCommand, WithdrawalCommand, WithdrawalHandler,
    WithdrawalResult,
};
use crate::store::Store;
use crate::validation::input::{self, FieldErrors};

use super::middleware::Principal;

/// Shared state of all routes
#[derive(Clone)]
pub struct AppState<S: Store> {
    pub store: S,
    pub clock: SharedClock,
    pub card_validity_years: u32,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, clock: SharedClock, card_validity_years: u32) -> Self {
        Self {
            store,
            clock,
            card_validity_years,
        }
    }
}

// =========================================================================
// Request types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct WithdrawalRequest {
    pub number: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct RechargeRequest {
    pub number: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub number: String,
    pub target_number: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct IssueCardRequest {
    pub user_id: Uuid,
    pub number: String,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLimitRequest {
    pub limit: String,
}

impl WithdrawalRequest {
    fn into_command(self, username: String) -> Result<WithdrawalCommand, FieldErrors> {
        let mut errors = FieldErrors::new();
        let number = input::card_number(&mut errors, "number", &self.number);
        let amount = input::amount(&mut errors, "amount", &self.amount);

        match (number, amount) {
            (Some(number), Some(amount)) => Ok(WithdrawalCommand::new(username, number, amount)),
            _ => Err(errors),
        }
    }
}

impl RechargeRequest {
    fn into_command(self, username: String) -> Result<RechargeCommand, FieldErrors> {
        let mut errors = FieldErrors::new();
        let number = input::card_number(&mut errors, "number", &self.number);
        let amount = input::recharge_amount(&mut errors, "amount", &self.amount);

        match (number, amount) {
            (Some(number), Some(amount)) => Ok(RechargeCommand::new(username, number, amount)),
            _ => Err(errors),
        }
    }
}

impl TransferRequest {
    fn into_command(self, username: String) -> Result<TransferCommand, FieldErrors> {
        let mut errors = FieldErrors::new();
        let number = input::card_number(&mut errors, "number", &self.number);
        let target_number = input::card_number(&mut errors, "target_number", &self.target_number);
        let amount = input::amount(&mut errors, "amount", &self.amount);

        match (number, target_number, amount) {
            (Some(number), Some(target_number), Some(amount)) => {
                Ok(TransferCommand::new(username, number, target_number, amount))
            }
            _ => Err(errors),
        }
    }
}

fn principal(principal: Option<Extension<Principal>>) -> Result<String, AppError> {
    principal
        .map(|Extension(p)| p.username)
        .ok_or(AppError::MissingPrincipal)
}

// =========================================================================
// Router
// =========================================================================

/// Create the API router
pub fn create_router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        // Funds movement
        .route("/transfer", post(transfer::<S>))
        .route("/transfer/withdrawal", post(withdrawal::<S>))
        .route("/transfer/recharge", post(recharge::<S>))
        // Block requests
        .route("/block/:id", patch(create_block_request::<S>))
        .route("/block/:id/status", put(update_block_request_status::<S>))
        // Card administration
        .route("/admin/cards", post(issue_card::<S>))
        .route("/admin/cards/:id", delete(delete_card::<S>))
        .route("/admin/cards/:id/status", patch(update_card_status::<S>))
        .route("/admin/cards/:id/limits/daily", put(update_daily_limit::<S>))
        .route("/admin/cards/:id/limits/monthly", put(update_monthly_limit::<S>))
}

// =========================================================================
// Funds movement
// =========================================================================

async fn transfer<S: Store>(
    State(state): State<AppState<S>>,
    caller: Option<Extension<Principal>>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<TransferResult>, AppError> {
    let command = req.into_command(principal(caller)?)?;
    let handler = TransferHandler::new(state.store, state.clock);
    Ok(Json(handler.execute(command).await?))
}

async fn withdrawal<S: Store>(
    State(state): State<AppState<S>>,
    caller: Option<Extension<Principal>>,
    Json(req): Json<WithdrawalRequest>,
) -> Result<Json<WithdrawalResult>, AppError> {
    let command = req.into_command(principal(caller)?)?;
    let handler = WithdrawalHandler::new(state.store, state.clock);
    Ok(Json(handler.execute(command).await?))
}

async fn recharge<S: Store>(
    State(state): State<AppState<S>>,
    caller: Option<Extension<Principal>>,
    Json(req): Json<RechargeRequest>,
) -> Result<Json<RechargeResult>, AppError> {
    let command = req.into_command(principal(caller)?)?;
    let handler = RechargeHandler::new(state.store, state.clock);
    Ok(Json(handler.execute(command).await?))
}

// =========================================================================
// Block requests
// =========================================================================

async fn create_block_request<S: Store>(
    State(state): State<AppState<S>>,
    caller: Option<Extension<Principal>>,
    Path(card_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let command = CreateBlockRequestCommand {
        username: principal(caller)?,
        card_id,
    };
    BlockRequestHandler::new(state.store, state.clock)
        .create(command)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_block_request_status<S: Store>(
    State(state): State<AppState<S>>,
    Path(request_id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<BlockRequestView>, AppError> {
    let mut errors = FieldErrors::new();
    let decision = input::block_decision(&mut errors, "status", &req.status);
    let Some(decision) = decision else {
        return Err(errors.into());
    };

    let view = BlockRequestHandler::new(state.store, state.clock)
        .update_status(UpdateBlockRequestStatusCommand {
            request_id,
            decision,
        })
        .await?;
    Ok(Json(view))
}

// =========================================================================
// Card administration
// =========================================================================

async fn issue_card<S: Store>(
    State(state): State<AppState<S>>,
    Json(req): Json<IssueCardRequest>,
) -> Result<(StatusCode, Json<CardView>), AppError> {
    let mut errors = FieldErrors::new();
    let Some(number) = input::card_number(&mut errors, "number", &req.number) else {
        return Err(errors.into());
    };

    let view = CardHandler::new(state.store, state.clock, state.card_validity_years)
        .issue(IssueCardCommand {
            user_id: req.user_id,
            number,
            expiration_date: req.expiration_date,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn update_card_status<S: Store>(
    State(state): State<AppState<S>>,
    Path(card_id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<StatusCode, AppError> {
    let mut errors = FieldErrors::new();
    let Some(status) = input::admin_card_status(&mut errors, "status", &req.status) else {
        return Err(errors.into());
    };

    CardHandler::new(state.store, state.clock, state.card_validity_years)
        .update_status(UpdateCardStatusCommand { card_id, status })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_card<S: Store>(
    State(state): State<AppState<S>>,
    Path(card_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    CardHandler::new(state.store, state.clock, state.card_validity_years)
        .delete(card_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_daily_limit<S: Store>(
    State(state): State<AppState<S>>,
    Path(card_id): Path<Uuid>,
    Json(req): Json<UpdateLimitRequest>,
) -> Result<Json<LimitView>, AppError> {
    update_limit(state, card_id, LimitPeriod::Daily, req).await
}

async fn update_monthly_limit<S: Store>(
    State(state): State<AppState<S>>,
    Path(card_id): Path<Uuid>,
    Json(req): Json<UpdateLimitRequest>,
) -> Result<Json<LimitView>, AppError> {
    update_limit(state, card_id, LimitPeriod::Monthly, req).await
}

async fn update_limit<S: Store>(
    state: AppState<S>,
    card_id: Uuid,
    period: LimitPeriod,
    req: UpdateLimitRequest,
) -> Result<Json<LimitView>, AppError> {
    let mut errors = FieldErrors::new();
    let Some(value) = input::limit_value(&mut errors, "limit", &req.limit) else {
        return Err(errors.into());
    };

    let view = CardHandler::new(state.store, state.clock, state.card_validity_years)
        .update_limit(UpdateLimitCommand {
            card_id,
            period,
            value,
        })
        .await?;
    Ok(Json(view))
}
