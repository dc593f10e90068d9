//! Per-transfer serialization.
//!
//! Every mutating path (issuance, reconciliation, expiry sweep, admin
//! override) takes the transfer's lock first, so concurrent checks cannot
//! interleave history appends or double-apply a transition. Different
//! transfers never contend.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct TransferLocks {
    inner: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl TransferLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let mutex = self
            .inner
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}
