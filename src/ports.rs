//! Repository port for transfer persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::Transfer;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("row not found".to_string()),
            other => RepositoryError::Storage(other.to_string()),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Persistence seam for transfers. The whole aggregate (including both
/// append-only histories) travels through this interface.
#[async_trait]
pub trait TransferRepository: Send + Sync {
    async fn insert(&self, transfer: &Transfer) -> RepositoryResult<Transfer>;
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Transfer>;
    /// Look a transfer up by its virtual account's correlation reference.
    async fn find_by_reference(&self, reference: &str) -> RepositoryResult<Transfer>;
    async fn update(&self, transfer: &Transfer) -> RepositoryResult<Transfer>;
    async fn list(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Transfer>>;
    /// Unfunded transfers whose payment window has passed.
    async fn find_expired(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<Transfer>>;
    /// Cheap liveness probe for the health endpoint.
    async fn ping(&self) -> RepositoryResult<()>;
}
