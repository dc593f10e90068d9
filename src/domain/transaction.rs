//! Transfer domain entity and its status state machine.
//! Framework-agnostic; persistence and transport live in the adapters.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::quote::Quote;
use super::reconciliation::ReconciliationResult;

/// Authoritative status of a transfer.
///
/// Happy path: CREATED -> PENDING_PAYMENT -> PENDING_APPROVAL -> PROCESSING -> COMPLETED.
/// FAILED is reachable from any non-terminal state, CANCELLED from any state
/// before PROCESSING, EXPIRED only from PENDING_PAYMENT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Created,
    PendingPayment,
    PendingApproval,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Expired,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Created => "CREATED",
            TransferStatus::PendingPayment => "PENDING_PAYMENT",
            TransferStatus::PendingApproval => "PENDING_APPROVAL",
            TransferStatus::Processing => "PROCESSING",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Failed => "FAILED",
            TransferStatus::Cancelled => "CANCELLED",
            TransferStatus::Expired => "EXPIRED",
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Completed
                | TransferStatus::Failed
                | TransferStatus::Cancelled
                | TransferStatus::Expired
        )
    }

    /// Whether the normal (non-override) path permits moving to `next`.
    fn allows(self, next: TransferStatus) -> bool {
        use TransferStatus::*;

        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Created, PendingPayment) => true,
            (PendingPayment, PendingApproval) => true,
            (PendingApproval, Processing) => true,
            (Processing, Completed) => true,
            (PendingPayment, Expired) => true,
            // Irrecoverable errors can strike anywhere before a terminal state.
            (_, Failed) => true,
            // Cancellation is only possible before money starts moving.
            (Created | PendingPayment | PendingApproval, Cancelled) => true,
            _ => false,
        }
    }

    pub const ALL: [TransferStatus; 8] = [
        TransferStatus::Created,
        TransferStatus::PendingPayment,
        TransferStatus::PendingApproval,
        TransferStatus::Processing,
        TransferStatus::Completed,
        TransferStatus::Failed,
        TransferStatus::Cancelled,
        TransferStatus::Expired,
    ];
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown transfer status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TransferStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransferStatus::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// What caused a status transition. Admin overrides must stay distinguishable
/// from reconciliation-driven transitions in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Issuance,
    Reconciliation,
    Approval,
    Payout,
    Expiry,
    User,
    AdminOverride,
}

/// Append-only audit entry for a status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: TransferStatus,
    pub to: TransferStatus,
    pub trigger: Trigger,
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

/// Single-use collection account issued by the payment rail.
/// Owned by exactly one transfer, never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualAccount {
    pub account_number: String,
    pub bank_name: String,
    pub provider: String,
    pub reference: String,
    pub expires_at: DateTime<Utc>,
}

impl VirtualAccount {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: TransferStatus,
    pub to: TransferStatus,
}

/// Domain entity representing a money transfer.
///
/// `transfer_fee` and `total_payable` are locked at creation and never change,
/// even if exchange rates move later. Histories are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recipient_id: Uuid,
    pub send_amount: BigDecimal,
    pub transfer_fee: BigDecimal,
    pub total_payable: BigDecimal,
    pub from_currency: String,
    pub to_currency: String,
    pub exchange_rate: BigDecimal,
    pub rate_captured_at: DateTime<Utc>,
    pub status: TransferStatus,
    pub virtual_account: Option<VirtualAccount>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub reconciliation_history: Vec<ReconciliationResult>,
    pub status_history: Vec<StatusChange>,
}

impl Transfer {
    pub fn new(
        user_id: Uuid,
        recipient_id: Uuid,
        quote: Quote,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            recipient_id,
            send_amount: quote.send_amount,
            transfer_fee: quote.transfer_fee,
            total_payable: quote.total_payable,
            from_currency: quote.from_currency,
            to_currency: quote.to_currency,
            exchange_rate: quote.rate,
            rate_captured_at: quote.rate_captured_at,
            status: TransferStatus::Created,
            virtual_account: None,
            created_at: now,
            completed_at: None,
            expires_at: now + ttl,
            reconciliation_history: Vec::new(),
            status_history: Vec::new(),
        }
    }

    /// Apply a status transition.
    ///
    /// Terminal states are final regardless of trigger. An `AdminOverride`
    /// bypasses the normal-path guard but nothing else.
    pub fn transition(
        &mut self,
        next: TransferStatus,
        trigger: Trigger,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        let denied = InvalidTransition {
            from: self.status,
            to: next,
        };
        if self.status.is_terminal() || next == self.status {
            return Err(denied);
        }
        let allowed = match trigger {
            Trigger::AdminOverride => true,
            _ => self.status.allows(next),
        };
        if !allowed {
            return Err(denied);
        }

        self.status_history.push(StatusChange {
            from: self.status,
            to: next,
            trigger,
            reason,
            at: now,
        });
        self.status = next;

        match next {
            TransferStatus::Completed => self.completed_at = Some(now),
            // The bound collection account is released when the window closes.
            TransferStatus::Expired => self.virtual_account = None,
            _ => {}
        }
        Ok(())
    }

    pub fn record_reconciliation(&mut self, result: ReconciliationResult) {
        self.reconciliation_history.push(result);
    }

    pub fn latest_reconciliation(&self) -> Option<&ReconciliationResult> {
        self.reconciliation_history.last()
    }

    pub fn active_virtual_account(&self, now: DateTime<Utc>) -> Option<&VirtualAccount> {
        self.virtual_account.as_ref().filter(|va| va.is_active(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::{build_quote, FeeSchedule};

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn schedule() -> FeeSchedule {
        FeeSchedule::new(dec("0.02"), dec("1.00"))
    }

    fn sample_transfer() -> Transfer {
        let quote = build_quote(
            dec("100.00"),
            "USD",
            "NGN",
            dec("1500"),
            Utc::now(),
            &schedule(),
        )
        .unwrap();
        Transfer::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            quote,
            Utc::now(),
            Duration::minutes(30),
        )
    }

    fn sample_account() -> VirtualAccount {
        VirtualAccount {
            account_number: "9923001122".to_string(),
            bank_name: "Wema Bank".to_string(),
            provider: "rail".to_string(),
            reference: "CT-TEST".to_string(),
            expires_at: Utc::now() + Duration::minutes(30),
        }
    }

    #[test]
    fn happy_path_transitions() {
        let mut t = sample_transfer();
        let now = Utc::now();
        t.transition(TransferStatus::PendingPayment, Trigger::Issuance, None, now)
            .unwrap();
        t.transition(
            TransferStatus::PendingApproval,
            Trigger::Reconciliation,
            None,
            now,
        )
        .unwrap();
        t.transition(TransferStatus::Processing, Trigger::Approval, None, now)
            .unwrap();
        t.transition(TransferStatus::Completed, Trigger::Payout, None, now)
            .unwrap();

        assert_eq!(t.status, TransferStatus::Completed);
        assert_eq!(t.completed_at, Some(now));
        assert_eq!(t.status_history.len(), 4);
    }

    #[test]
    fn no_transition_out_of_any_terminal_state() {
        let terminals = [
            TransferStatus::Completed,
            TransferStatus::Failed,
            TransferStatus::Cancelled,
            TransferStatus::Expired,
        ];
        for terminal in terminals {
            for target in TransferStatus::ALL {
                for trigger in [Trigger::Reconciliation, Trigger::AdminOverride] {
                    let mut t = sample_transfer();
                    t.status = terminal;
                    let err = t.transition(target, trigger, None, Utc::now()).unwrap_err();
                    assert_eq!(err.from, terminal);
                    assert_eq!(err.to, target);
                }
            }
        }
    }

    #[test]
    fn cancellation_denied_once_processing() {
        let mut t = sample_transfer();
        t.status = TransferStatus::Processing;
        let err = t
            .transition(TransferStatus::Cancelled, Trigger::User, None, Utc::now())
            .unwrap_err();
        assert_eq!(err.from, TransferStatus::Processing);

        let mut t = sample_transfer();
        t.status = TransferStatus::PendingApproval;
        t.transition(TransferStatus::Cancelled, Trigger::User, None, Utc::now())
            .unwrap();
    }

    #[test]
    fn expiry_only_from_pending_payment_and_releases_account() {
        let mut t = sample_transfer();
        let err = t
            .transition(TransferStatus::Expired, Trigger::Expiry, None, Utc::now())
            .unwrap_err();
        assert_eq!(err.from, TransferStatus::Created);

        let mut t = sample_transfer();
        t.status = TransferStatus::PendingPayment;
        t.virtual_account = Some(sample_account());
        t.transition(TransferStatus::Expired, Trigger::Expiry, None, Utc::now())
            .unwrap();
        assert!(t.virtual_account.is_none());
    }

    #[test]
    fn admin_override_bypasses_path_guard_only() {
        let mut t = sample_transfer();
        t.status = TransferStatus::PendingPayment;
        // Not reachable on the normal path, allowed as an override.
        t.transition(
            TransferStatus::Completed,
            Trigger::AdminOverride,
            Some("funds confirmed out of band".to_string()),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(t.status, TransferStatus::Completed);
        assert_eq!(
            t.status_history.last().unwrap().trigger,
            Trigger::AdminOverride
        );
    }

    #[test]
    fn same_state_transition_is_denied() {
        let mut t = sample_transfer();
        assert!(t
            .transition(TransferStatus::Created, Trigger::User, None, Utc::now())
            .is_err());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in TransferStatus::ALL {
            assert_eq!(TransferStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(TransferStatus::from_str("SETTLED").is_err());
    }

    #[test]
    fn expired_virtual_account_is_not_active() {
        let mut t = sample_transfer();
        let mut account = sample_account();
        account.expires_at = Utc::now() - Duration::minutes(1);
        t.virtual_account = Some(account);
        assert!(t.active_virtual_account(Utc::now()).is_none());
    }
}
