//! Reconciliation engine.
//!
//! Compares funds observed on the rail against the transfer's locked total
//! and advances the state machine. Each completed check appends one
//! immutable result to the transfer's history, including `pending` ones, so
//! repeated manual checks stay visible in the audit trail.

use bigdecimal::BigDecimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::reconciliation::{evaluate, Classification, ReconciliationResult};
use crate::domain::{Clock, InvalidTransition, Transfer, TransferStatus, Trigger};
use crate::error::AppError;
use crate::ports::TransferRepository;
use crate::rail::{PaymentRail, PaymentState};
use crate::services::locks::TransferLocks;

#[derive(Clone)]
pub struct ReconciliationService {
    repo: Arc<dyn TransferRepository>,
    rail: Arc<dyn PaymentRail>,
    locks: TransferLocks,
    epsilon: BigDecimal,
    clock: Arc<dyn Clock>,
}

impl ReconciliationService {
    pub fn new(
        repo: Arc<dyn TransferRepository>,
        rail: Arc<dyn PaymentRail>,
        locks: TransferLocks,
        epsilon: BigDecimal,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            rail,
            locks,
            epsilon,
            clock,
        }
    }

    /// Run one reconciliation check for a transfer.
    ///
    /// Serialized per transfer id: a manual check racing the automatic path
    /// cannot interleave history appends or double-apply a transition.
    pub async fn check(&self, id: Uuid) -> Result<(Transfer, ReconciliationResult), AppError> {
        let _guard = self.locks.lock(id).await;

        let mut transfer = self.repo.get_by_id(id).await?;

        if transfer.status.is_terminal() {
            return Err(AppError::InvalidTransition(InvalidTransition {
                from: transfer.status,
                to: TransferStatus::PendingApproval,
            }));
        }
        let Some(account) = transfer.virtual_account.clone() else {
            return Err(AppError::Validation(format!(
                "transfer {} has no virtual account to reconcile against",
                id
            )));
        };

        // A rail timeout propagates as a transient error and appends nothing:
        // it is not evidence that no payment arrived.
        let payments = self.rail.inbound_payments(&account.reference).await?;

        if payments.len() > 1 {
            tracing::warn!(
                transfer_id = %id,
                count = payments.len(),
                "multiple inbound payments for one reference, admin resolution required"
            );
            return Err(AppError::ReconciliationAmbiguity {
                transfer_id: id,
                count: payments.len(),
            });
        }

        let now = self.clock.now();
        let payment = payments.first();
        let reversed = payment.is_some_and(|p| p.state == PaymentState::Reversed);
        let result = evaluate(
            &transfer.total_payable,
            payment.map(|p| &p.amount),
            reversed,
            &self.epsilon,
            now,
        );
        transfer.record_reconciliation(result.clone());

        match result.classification {
            Classification::Success | Classification::Overpayment
                if transfer.status == TransferStatus::PendingPayment =>
            {
                transfer.transition(
                    TransferStatus::PendingApproval,
                    Trigger::Reconciliation,
                    None,
                    now,
                )?;
            }
            Classification::Failed => {
                transfer.transition(
                    TransferStatus::Failed,
                    Trigger::Reconciliation,
                    Some("payment reversed by rail".to_string()),
                    now,
                )?;
            }
            _ => {}
        }

        let updated = self.repo.update(&transfer).await?;
        tracing::info!(
            transfer_id = %id,
            classification = ?result.classification,
            received = %result.received_amount,
            expected = %result.expected_amount,
            "reconciliation check recorded"
        );
        Ok((updated, result))
    }
}
