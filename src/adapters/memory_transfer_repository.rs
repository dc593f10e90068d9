//! In-memory implementation of TransferRepository.
//! Used by the test suites and handy for local runs without Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Transfer, TransferStatus};
use crate::ports::{RepositoryError, RepositoryResult, TransferRepository};

#[derive(Clone, Default)]
pub struct MemoryTransferRepository {
    inner: Arc<RwLock<HashMap<Uuid, Transfer>>>,
}

impl MemoryTransferRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferRepository for MemoryTransferRepository {
    async fn insert(&self, transfer: &Transfer) -> RepositoryResult<Transfer> {
        let mut store = self.inner.write().await;
        if store.contains_key(&transfer.id) {
            return Err(RepositoryError::Storage(format!(
                "duplicate transfer id {}",
                transfer.id
            )));
        }
        store.insert(transfer.id, transfer.clone());
        Ok(transfer.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Transfer> {
        self.inner
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn find_by_reference(&self, reference: &str) -> RepositoryResult<Transfer> {
        self.inner
            .read()
            .await
            .values()
            .find(|t| {
                t.virtual_account
                    .as_ref()
                    .is_some_and(|va| va.reference == reference)
            })
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(reference.to_string()))
    }

    async fn update(&self, transfer: &Transfer) -> RepositoryResult<Transfer> {
        let mut store = self.inner.write().await;
        if !store.contains_key(&transfer.id) {
            return Err(RepositoryError::NotFound(transfer.id.to_string()));
        }
        store.insert(transfer.id, transfer.clone());
        Ok(transfer.clone())
    }

    async fn list(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Transfer>> {
        let store = self.inner.read().await;
        let mut all: Vec<Transfer> = store.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<Transfer>> {
        Ok(self
            .inner
            .read()
            .await
            .values()
            .filter(|t| t.status == TransferStatus::PendingPayment && t.expires_at <= now)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}
