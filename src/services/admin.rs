//! Operator actions: approval, payout confirmation, cancellation, and
//! audited status overrides.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Clock, Transfer, TransferStatus, Trigger};
use crate::error::AppError;
use crate::ports::TransferRepository;
use crate::services::locks::TransferLocks;

#[derive(Clone)]
pub struct AdminService {
    repo: Arc<dyn TransferRepository>,
    locks: TransferLocks,
    clock: Arc<dyn Clock>,
}

impl AdminService {
    pub fn new(
        repo: Arc<dyn TransferRepository>,
        locks: TransferLocks,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { repo, locks, clock }
    }

    /// Approve a funded transfer for payout.
    pub async fn approve(&self, id: Uuid) -> Result<Transfer, AppError> {
        let _guard = self.locks.lock(id).await;
        let mut transfer = self.repo.get_by_id(id).await?;
        transfer.transition(
            TransferStatus::Processing,
            Trigger::Approval,
            None,
            self.clock.now(),
        )?;
        let updated = self.repo.update(&transfer).await?;
        tracing::info!(transfer_id = %id, "transfer approved for payout");
        Ok(updated)
    }

    /// Record that the payout leg settled.
    pub async fn confirm_payout(&self, id: Uuid) -> Result<Transfer, AppError> {
        let _guard = self.locks.lock(id).await;
        let mut transfer = self.repo.get_by_id(id).await?;
        transfer.transition(
            TransferStatus::Completed,
            Trigger::Payout,
            None,
            self.clock.now(),
        )?;
        let updated = self.repo.update(&transfer).await?;
        tracing::info!(transfer_id = %id, "payout confirmed, transfer completed");
        Ok(updated)
    }

    /// Cancel a transfer on behalf of its sender. Refused once payout has
    /// started or a terminal status is reached.
    pub async fn cancel(&self, id: Uuid, reason: Option<String>) -> Result<Transfer, AppError> {
        let _guard = self.locks.lock(id).await;
        let mut transfer = self.repo.get_by_id(id).await?;
        transfer.transition(
            TransferStatus::Cancelled,
            Trigger::User,
            reason,
            self.clock.now(),
        )?;
        let updated = self.repo.update(&transfer).await?;
        tracing::info!(transfer_id = %id, "transfer cancelled");
        Ok(updated)
    }

    /// Force a transfer into an arbitrary non-terminal-violating status.
    ///
    /// Skips the normal path checks but never resurrects a terminal
    /// transfer. A reason is mandatory; the override lands in the status
    /// history like any other change.
    pub async fn force_status(
        &self,
        id: Uuid,
        new_status: TransferStatus,
        reason: &str,
    ) -> Result<Transfer, AppError> {
        if reason.trim().is_empty() {
            return Err(AppError::Validation(
                "a status override requires a reason".to_string(),
            ));
        }

        let _guard = self.locks.lock(id).await;
        let mut transfer = self.repo.get_by_id(id).await?;
        let from = transfer.status;
        transfer.transition(
            new_status,
            Trigger::AdminOverride,
            Some(reason.to_string()),
            self.clock.now(),
        )?;
        let updated = self.repo.update(&transfer).await?;
        tracing::warn!(
            transfer_id = %id,
            from = %from,
            to = %new_status,
            reason,
            "operator forced a status change"
        );
        Ok(updated)
    }
}
