//! Reconciliation classification.
//!
//! Pure comparison of observed funds against the expected payable amount.
//! Classification depends only on `received - expected` (within epsilon) and
//! the rail's explicit failure signal, so repeated checks with the same inputs
//! always agree.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Pending,
    Success,
    Partial,
    Overpayment,
    Failed,
}

/// Immutable record of one reconciliation check, appended to the transfer's
/// history every time a check completes (including `pending`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub expected_amount: BigDecimal,
    pub received_amount: BigDecimal,
    pub difference_amount: BigDecimal,
    pub classification: Classification,
    pub timestamp: DateTime<Utc>,
}

impl ReconciliationResult {
    /// Amount still missing when the payment came up short.
    pub fn shortfall(&self) -> Option<BigDecimal> {
        (self.classification == Classification::Partial)
            .then(|| &self.expected_amount - &self.received_amount)
    }

    /// Amount received beyond the expected total.
    pub fn excess(&self) -> Option<BigDecimal> {
        (self.classification == Classification::Overpayment)
            .then(|| &self.received_amount - &self.expected_amount)
    }
}

/// Classify an observed amount against the expected total.
///
/// `None` means no payment has been observed at all. Amounts within `epsilon`
/// of the expected total count as success (currency rounding tolerance).
pub fn classify(
    expected: &BigDecimal,
    received: Option<&BigDecimal>,
    epsilon: &BigDecimal,
) -> Classification {
    let Some(received) = received else {
        return Classification::Pending;
    };
    let zero = BigDecimal::from(0);
    if received <= &zero {
        return Classification::Pending;
    }

    let difference = received - expected;
    if difference.abs() <= *epsilon {
        Classification::Success
    } else if received < expected {
        Classification::Partial
    } else {
        Classification::Overpayment
    }
}

/// Build the reconciliation record for one check. `reversed` is the rail's
/// explicit failure signal and wins over any amount comparison.
pub fn evaluate(
    expected: &BigDecimal,
    received: Option<&BigDecimal>,
    reversed: bool,
    epsilon: &BigDecimal,
    now: DateTime<Utc>,
) -> ReconciliationResult {
    let classification = if reversed {
        Classification::Failed
    } else {
        classify(expected, received, epsilon)
    };
    let received_amount = received.cloned().unwrap_or_else(|| BigDecimal::from(0));
    let difference_amount = &received_amount - expected;

    ReconciliationResult {
        expected_amount: expected.clone(),
        received_amount,
        difference_amount,
        classification,
        timestamp: now,
    }
}
