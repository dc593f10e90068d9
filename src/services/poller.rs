//! Status polling.
//!
//! A cancellable task that watches a transfer until it reaches a terminal
//! status. Purely observational: cancelling the poll never touches any
//! transition a concurrent reconciliation has committed.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::domain::TransferStatus;
use crate::ports::{RepositoryError, TransferRepository};

#[derive(Debug, Error)]
pub enum PollError {
    #[error("polling timed out after {attempts} attempts, last known status {last_status:?}")]
    Timeout {
        attempts: u32,
        last_status: Option<TransferStatus>,
    },

    #[error("polling cancelled, last known status {last_status:?}")]
    Cancelled {
        last_status: Option<TransferStatus>,
    },

    #[error("transfer not found: {0}")]
    NotFound(Uuid),
}

#[derive(Clone)]
pub struct StatusPoller {
    repo: Arc<dyn TransferRepository>,
}

impl StatusPoller {
    pub fn new(repo: Arc<dyn TransferRepository>) -> Self {
        Self { repo }
    }

    /// Poll until the transfer reaches a terminal status.
    ///
    /// An initial snapshot is taken before the loop so a timeout always
    /// carries the last status that was actually observed. A failed attempt
    /// is "no new information" and never aborts the loop. Setting the cancel
    /// signal to `true` stops before the next attempt; the in-flight lookup
    /// of the current attempt is always awaited first.
    pub async fn poll_until_terminal(
        &self,
        id: Uuid,
        interval: Duration,
        max_attempts: u32,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<TransferStatus, PollError> {
        let mut last_status = match self.repo.get_by_id(id).await {
            Ok(transfer) => {
                if transfer.status.is_terminal() {
                    return Ok(transfer.status);
                }
                Some(transfer.status)
            }
            Err(RepositoryError::NotFound(_)) => return Err(PollError::NotFound(id)),
            Err(e) => {
                tracing::debug!(transfer_id = %id, error = %e, "initial status snapshot failed");
                None
            }
        };

        for attempt in 1..=max_attempts {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancelled(&mut cancel) => {
                    tracing::debug!(transfer_id = %id, "polling cancelled");
                    return Err(PollError::Cancelled { last_status });
                }
            }

            match self.repo.get_by_id(id).await {
                Ok(transfer) => {
                    last_status = Some(transfer.status);
                    if transfer.status.is_terminal() {
                        return Ok(transfer.status);
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        transfer_id = %id,
                        attempt,
                        error = %e,
                        "poll attempt failed, continuing"
                    );
                }
            }
        }

        Err(PollError::Timeout {
            attempts: max_attempts,
            last_status,
        })
    }
}

/// Resolves once the cancel signal turns true. Never resolves if the sender
/// goes away without cancelling.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryTransferRepository;
    use crate::domain::quote::{build_quote, FeeSchedule};
    use crate::domain::{Transfer, Trigger};
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn sample_transfer() -> Transfer {
        let schedule = FeeSchedule::new(
            BigDecimal::from_str("0.02").unwrap(),
            BigDecimal::from_str("1.00").unwrap(),
        );
        let quote = build_quote(
            BigDecimal::from_str("100.00").unwrap(),
            "USD",
            "NGN",
            BigDecimal::from_str("1500").unwrap(),
            Utc::now(),
            &schedule,
        )
        .unwrap();
        Transfer::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            quote,
            Utc::now(),
            chrono::Duration::minutes(30),
        )
    }

    /// Succeeds for the first `ok_reads` lookups, then fails every time.
    struct FlakyRepo {
        inner: MemoryTransferRepository,
        reads: AtomicU32,
        ok_reads: u32,
    }

    #[async_trait]
    impl TransferRepository for FlakyRepo {
        async fn insert(&self, t: &Transfer) -> crate::ports::RepositoryResult<Transfer> {
            self.inner.insert(t).await
        }
        async fn get_by_id(&self, id: Uuid) -> crate::ports::RepositoryResult<Transfer> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            if n < self.ok_reads {
                self.inner.get_by_id(id).await
            } else {
                Err(RepositoryError::Storage("connection reset".to_string()))
            }
        }
        async fn find_by_reference(&self, r: &str) -> crate::ports::RepositoryResult<Transfer> {
            self.inner.find_by_reference(r).await
        }
        async fn update(&self, t: &Transfer) -> crate::ports::RepositoryResult<Transfer> {
            self.inner.update(t).await
        }
        async fn list(&self, l: i64, o: i64) -> crate::ports::RepositoryResult<Vec<Transfer>> {
            self.inner.list(l, o).await
        }
        async fn find_expired(
            &self,
            now: chrono::DateTime<Utc>,
        ) -> crate::ports::RepositoryResult<Vec<Transfer>> {
            self.inner.find_expired(now).await
        }
        async fn ping(&self) -> crate::ports::RepositoryResult<()> {
            self.inner.ping().await
        }
    }

    fn no_cancel() -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        // Leak the sender so the channel stays open for the test's lifetime.
        std::mem::forget(tx);
        rx
    }

    #[tokio::test(start_paused = true)]
    async fn returns_immediately_on_terminal_status() {
        let repo = Arc::new(MemoryTransferRepository::new());
        let mut transfer = sample_transfer();
        transfer.status = TransferStatus::PendingPayment;
        transfer
            .transition(TransferStatus::Cancelled, Trigger::User, None, Utc::now())
            .unwrap();
        repo.insert(&transfer).await.unwrap();

        let poller = StatusPoller::new(repo);
        let status = poller
            .poll_until_terminal(transfer.id, Duration::from_secs(5), 3, no_cancel())
            .await
            .unwrap();
        assert_eq!(status, TransferStatus::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn observes_a_transition_mid_poll() {
        let repo = Arc::new(MemoryTransferRepository::new());
        let mut transfer = sample_transfer();
        transfer.status = TransferStatus::Processing;
        repo.insert(&transfer).await.unwrap();

        let poller = StatusPoller::new(repo.clone());
        let id = transfer.id;
        let handle = tokio::spawn(async move {
            poller
                .poll_until_terminal(id, Duration::from_secs(5), 10, no_cancel())
                .await
        });

        // Complete the transfer while the poller sleeps.
        tokio::time::sleep(Duration::from_secs(7)).await;
        let mut current = repo.get_by_id(id).await.unwrap();
        current
            .transition(TransferStatus::Completed, Trigger::Payout, None, Utc::now())
            .unwrap();
        repo.update(&current).await.unwrap();

        let status = handle.await.unwrap().unwrap();
        assert_eq!(status, TransferStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_carries_last_known_status_through_failed_attempts() {
        let inner = MemoryTransferRepository::new();
        let mut transfer = sample_transfer();
        transfer.status = TransferStatus::PendingPayment;
        inner.insert(&transfer).await.unwrap();

        // Initial snapshot succeeds, the three poll attempts all fail.
        let repo = Arc::new(FlakyRepo {
            inner,
            reads: AtomicU32::new(0),
            ok_reads: 1,
        });

        let poller = StatusPoller::new(repo);
        let err = poller
            .poll_until_terminal(transfer.id, Duration::from_secs(1), 3, no_cancel())
            .await
            .unwrap_err();

        match err {
            PollError::Timeout {
                attempts,
                last_status,
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_status, Some(TransferStatus::PendingPayment));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_before_next_attempt() {
        let repo = Arc::new(MemoryTransferRepository::new());
        let mut transfer = sample_transfer();
        transfer.status = TransferStatus::PendingPayment;
        repo.insert(&transfer).await.unwrap();

        let (tx, rx) = watch::channel(false);
        let poller = StatusPoller::new(repo);
        let id = transfer.id;
        let handle = tokio::spawn(async move {
            poller
                .poll_until_terminal(id, Duration::from_secs(60), 100, rx)
                .await
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();

        let err = handle.await.unwrap().unwrap_err();
        match err {
            PollError::Cancelled { last_status } => {
                assert_eq!(last_status, Some(TransferStatus::PendingPayment));
            }
            other => panic!("expected cancelled, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_transfer_is_not_found() {
        let repo = Arc::new(MemoryTransferRepository::new());
        let poller = StatusPoller::new(repo);
        let err = poller
            .poll_until_terminal(Uuid::new_v4(), Duration::from_secs(1), 3, no_cancel())
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::NotFound(_)));
    }
}
