use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::transaction::InvalidTransition;
use crate::ports::RepositoryError;
use crate::rail::{RailError, RateError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("ambiguous reconciliation for transfer {transfer_id}: {count} inbound payments share one reference")]
    ReconciliationAmbiguity { transfer_id: Uuid, count: usize },

    #[error("transient upstream error: {0}")]
    Transient(String),

    #[error("upstream rejection: {0}")]
    Upstream(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::ReconciliationAmbiguity { .. } => StatusCode::CONFLICT,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Transient(_))
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => AppError::NotFound(what),
            RepositoryError::Storage(msg) => AppError::Database(msg),
        }
    }
}

impl From<RailError> for AppError {
    fn from(err: RailError) -> Self {
        if err.is_transient() {
            AppError::Transient(err.to_string())
        } else {
            AppError::Upstream(err.to_string())
        }
    }
}

impl From<RateError> for AppError {
    fn from(err: RateError) -> Self {
        if err.is_transient() {
            AppError::Transient(err.to_string())
        } else {
            AppError::Upstream(err.to_string())
        }
    }
}

impl From<crate::domain::QuoteError> for AppError {
    fn from(err: crate::domain::QuoteError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
            "retryable": self.is_retryable(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransferStatus;

    #[test]
    fn test_validation_error_status_code() {
        let error = AppError::Validation("send amount must be greater than zero".to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_error_status_code() {
        let error = AppError::NotFound("transfer not found".to_string());
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_transition_status_code() {
        let error = AppError::InvalidTransition(InvalidTransition {
            from: TransferStatus::Completed,
            to: TransferStatus::Processing,
        });
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        assert!(error.to_string().contains("COMPLETED"));
        assert!(error.to_string().contains("PROCESSING"));
    }

    #[test]
    fn test_ambiguity_status_code() {
        let error = AppError::ReconciliationAmbiguity {
            transfer_id: Uuid::new_v4(),
            count: 2,
        };
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_transient_error_is_retryable() {
        let error = AppError::Transient("rail timed out".to_string());
        assert_eq!(error.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(error.is_retryable());
        assert!(!AppError::Upstream("rejected".to_string()).is_retryable());
    }

    #[tokio::test]
    async fn test_validation_error_response() {
        let error = AppError::Validation("unsupported currency: XAU".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_not_found_error_response() {
        let error = AppError::NotFound("transfer not found".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
