use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::ports::TransferRepository;
use crate::services::CreateTransferInput;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub send_amount: BigDecimal,
    pub from_currency: String,
    pub to_currency: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    pub user_id: Uuid,
    pub recipient_id: Uuid,
    pub send_amount: BigDecimal,
    pub from_currency: String,
    pub to_currency: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// POST /quotes — price a send intent without persisting anything.
pub async fn preview_quote(
    State(state): State<AppState>,
    Json(req): Json<QuoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quote = state
        .quotes
        .preview(req.send_amount, &req.from_currency, &req.to_currency)
        .await?;
    Ok(Json(quote))
}

/// POST /transfers — create a transfer with a locked quote.
pub async fn create_transfer(
    State(state): State<AppState>,
    Json(req): Json<CreateTransferRequest>,
) -> Result<impl IntoResponse, AppError> {
    let transfer = state
        .quotes
        .create_transfer(CreateTransferInput {
            user_id: req.user_id,
            recipient_id: req.recipient_id,
            send_amount: req.send_amount,
            from_currency: req.from_currency,
            to_currency: req.to_currency,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(transfer)))
}

/// POST /transfers/:id/virtual-account — request a collection account from
/// the rail. Safe to retry.
pub async fn issue_virtual_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let transfer = state.issuer.issue(id).await?;
    Ok(Json(transfer))
}

/// GET /transfers/:id
pub async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let transfer = state.repo.get_by_id(id).await?;
    Ok(Json(transfer))
}

/// GET /transfers?limit=&offset=
pub async fn list_transfers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);
    let transfers = state.repo.list(limit, offset).await?;
    Ok(Json(transfers))
}

/// POST /transfers/:id/reconcile — manual reconciliation check.
pub async fn reconcile_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (transfer, result) = state.reconciliation.check(id).await?;
    Ok(Json(serde_json::json!({
        "transfer": transfer,
        "result": result,
    })))
}

/// POST /transfers/:id/cancel
pub async fn cancel_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<impl IntoResponse, AppError> {
    let transfer = state.admin.cancel(id, req.reason).await?;
    Ok(Json(transfer))
}
