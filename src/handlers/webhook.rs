//! Payment rail webhook.
//!
//! The webhook is a hint, not a source of truth: a verified notification
//! only triggers a reconciliation check against the rail's payment records.
//! Status never changes on the strength of the webhook body alone.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::AppError;
use crate::ports::TransferRepository;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-rail-signature";

#[derive(Debug, Deserialize)]
pub struct PaymentNotification {
    pub reference: String,
}

/// POST /webhooks/payments
///
/// Verifies the HMAC-SHA256 signature over the raw body, then reconciles the
/// referenced transfer. An unknown reference is acknowledged with 200 so the
/// rail stops retrying notifications we can never match.
pub async fn payment_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Validation("missing webhook signature".to_string()))?;
    verify_signature(state.webhook_secret.as_bytes(), &body, signature)?;

    let notification: PaymentNotification = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("malformed webhook payload: {}", e)))?;

    let transfer = match state.repo.find_by_reference(&notification.reference).await {
        Ok(transfer) => transfer,
        Err(crate::ports::RepositoryError::NotFound(_)) => {
            tracing::warn!(
                reference = %notification.reference,
                "webhook for unknown payment reference, acknowledging"
            );
            return Ok((
                StatusCode::OK,
                Json(serde_json::json!({ "status": "ignored" })),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let (updated, result) = state.reconciliation.check(transfer.id).await?;
    tracing::info!(
        transfer_id = %updated.id,
        classification = ?result.classification,
        "webhook-triggered reconciliation finished"
    );
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "processed",
            "transfer_id": updated.id,
            "classification": result.classification,
        })),
    ))
}

fn verify_signature(secret: &[u8], body: &[u8], signature_hex: &str) -> Result<(), AppError> {
    let expected = hex::decode(signature_hex)
        .map_err(|_| AppError::Validation("webhook signature is not valid hex".to_string()))?;
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(format!("webhook secret unusable: {}", e)))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| AppError::Validation("webhook signature mismatch".to_string()))
}
