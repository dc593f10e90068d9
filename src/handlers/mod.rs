pub mod admin;
pub mod transfers;
pub mod webhook;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::ports::TransferRepository;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub db: String,
}

/// Liveness plus a storage round-trip. Returns 503 when the repository is
/// unreachable so load balancers can drain the instance.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db_status = match state.repo.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::error!(error = %e, "health check storage probe failed");
            "disconnected"
        }
    };

    let healthy = db_status == "connected";
    let body = HealthStatus {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        db: db_status.to_string(),
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(body))
}
