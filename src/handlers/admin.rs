//! Operator endpoints. These sit behind the deployment's admin gateway and
//! every mutation they perform is audited in the transfer's status history.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::quote::FeeSchedule;
use crate::domain::TransferStatus;
use crate::error::AppError;
use crate::ports::TransferRepository;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub status: TransferStatus,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct FeeScheduleRequest {
    pub percent: BigDecimal,
    pub flat_minimum: BigDecimal,
}

/// POST /admin/transfers/:id/approve
pub async fn approve_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let transfer = state.admin.approve(id).await?;
    Ok(Json(transfer))
}

/// POST /admin/transfers/:id/payout-confirmed
pub async fn confirm_payout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let transfer = state.admin.confirm_payout(id).await?;
    Ok(Json(transfer))
}

/// POST /admin/transfers/:id/override
pub async fn override_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<OverrideRequest>,
) -> Result<impl IntoResponse, AppError> {
    let transfer = state.admin.force_status(id, req.status, &req.reason).await?;
    Ok(Json(transfer))
}

/// GET /admin/transfers/:id/history — full audit trail: every status change
/// and every reconciliation result, oldest first.
pub async fn transfer_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let transfer = state.repo.get_by_id(id).await?;
    Ok(Json(serde_json::json!({
        "transfer_id": transfer.id,
        "status": transfer.status,
        "status_history": transfer.status_history,
        "reconciliation_history": transfer.reconciliation_history,
    })))
}

/// PUT /admin/fee-schedule — replace the live fee schedule. Takes effect for
/// quotes computed after the swap; existing transfers keep their locked fee.
pub async fn update_fee_schedule(
    State(state): State<AppState>,
    Json(req): Json<FeeScheduleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.percent < BigDecimal::from(0) || req.flat_minimum < BigDecimal::from(0) {
        return Err(AppError::Validation(
            "fee schedule values must be non-negative".to_string(),
        ));
    }
    let schedule = FeeSchedule::new(req.percent, req.flat_minimum);
    state.fee_schedule.store(Arc::new(schedule.clone()));
    tracing::warn!(
        percent = %schedule.percent,
        flat_minimum = %schedule.flat_minimum,
        "fee schedule replaced"
    );
    Ok(Json(schedule))
}
