//! Virtual account issuance.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Clock, Transfer, TransferStatus, Trigger, VirtualAccount};
use crate::error::AppError;
use crate::ports::TransferRepository;
use crate::rail::PaymentRail;
use crate::services::locks::TransferLocks;

/// Requests a single-use collection account from the payment rail and binds
/// it to the transfer.
///
/// Idempotent per transfer id: a retried call for a transfer that already
/// holds an active account returns that account instead of creating a
/// duplicate. On provider error the transfer stays in CREATED and the error
/// carries its retry hint.
#[derive(Clone)]
pub struct IssuerService {
    repo: Arc<dyn TransferRepository>,
    rail: Arc<dyn PaymentRail>,
    locks: TransferLocks,
    clock: Arc<dyn Clock>,
}

impl IssuerService {
    pub fn new(
        repo: Arc<dyn TransferRepository>,
        rail: Arc<dyn PaymentRail>,
        locks: TransferLocks,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            rail,
            locks,
            clock,
        }
    }

    pub async fn issue(&self, id: Uuid) -> Result<Transfer, AppError> {
        let _guard = self.locks.lock(id).await;

        let mut transfer = self.repo.get_by_id(id).await?;
        let now = self.clock.now();

        if transfer.active_virtual_account(now).is_some() {
            tracing::debug!(transfer_id = %id, "issuance retried, returning existing account");
            return Ok(transfer);
        }
        if !matches!(
            transfer.status,
            TransferStatus::Created | TransferStatus::PendingPayment
        ) {
            return Err(AppError::InvalidTransition(
                crate::domain::InvalidTransition {
                    from: transfer.status,
                    to: TransferStatus::PendingPayment,
                },
            ));
        }

        let reference = reference_for(&transfer);
        let issued = self
            .rail
            .issue_virtual_account(
                transfer.id,
                &transfer.total_payable,
                &transfer.from_currency,
                &reference,
            )
            .await
            .map_err(|e| {
                tracing::warn!(transfer_id = %id, error = %e, "virtual account issuance failed");
                AppError::from(e)
            })?;

        transfer.virtual_account = Some(VirtualAccount {
            account_number: issued.account_number,
            bank_name: issued.bank_name,
            provider: issued.provider,
            reference: issued.reference,
            expires_at: issued.expires_at,
        });
        if transfer.status == TransferStatus::Created {
            transfer.transition(TransferStatus::PendingPayment, Trigger::Issuance, None, now)?;
        }
        let updated = self.repo.update(&transfer).await?;

        tracing::info!(
            transfer_id = %id,
            reference = %reference,
            "virtual account bound, awaiting funding"
        );
        Ok(updated)
    }
}

/// Correlation key the rail stamps on inbound funds for this transfer.
fn reference_for(transfer: &Transfer) -> String {
    format!("CT-{}", transfer.id.simple().to_string().to_uppercase())
}
