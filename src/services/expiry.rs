//! Expiry sweeper.
//!
//! Background job that expires transfers whose payment window closed with no
//! funding observed, releasing their virtual accounts. Runs independently of
//! the HTTP server.

use std::sync::Arc;
use tokio::time::{sleep, Duration};

use crate::domain::{Clock, TransferStatus, Trigger};
use crate::error::AppError;
use crate::ports::TransferRepository;
use crate::services::locks::TransferLocks;

#[derive(Clone)]
pub struct ExpirySweeper {
    repo: Arc<dyn TransferRepository>,
    locks: TransferLocks,
    clock: Arc<dyn Clock>,
}

impl ExpirySweeper {
    pub fn new(
        repo: Arc<dyn TransferRepository>,
        locks: TransferLocks,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { repo, locks, clock }
    }

    /// Runs the sweeper loop forever. Batch errors are logged and the loop
    /// continues.
    pub async fn run(self, interval: Duration) {
        tracing::info!(interval_secs = interval.as_secs(), "expiry sweeper started");
        loop {
            match self.sweep_once().await {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "expired unfunded transfers"),
                Err(e) => tracing::error!(error = %e, "expiry sweep failed"),
            }
            sleep(interval).await;
        }
    }

    /// Expire every overdue, unfunded transfer. Returns how many expired.
    pub async fn sweep_once(&self) -> Result<u32, AppError> {
        let now = self.clock.now();
        let candidates = self.repo.find_expired(now).await?;

        let mut expired = 0;
        for candidate in candidates {
            let _guard = self.locks.lock(candidate.id).await;

            // Re-read under the lock: a reconciliation may have advanced the
            // transfer between the query and this point.
            let mut transfer = self.repo.get_by_id(candidate.id).await?;
            if transfer.status != TransferStatus::PendingPayment || transfer.expires_at > now {
                continue;
            }

            transfer.transition(
                TransferStatus::Expired,
                Trigger::Expiry,
                Some("payment window elapsed with no funding observed".to_string()),
                now,
            )?;
            self.repo.update(&transfer).await?;
            tracing::info!(transfer_id = %transfer.id, "transfer expired, virtual account released");
            expired += 1;
        }
        Ok(expired)
    }
}
