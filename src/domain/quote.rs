//! Fee and quote computation.
//!
//! The fee schedule is an injected configuration value: the single source of
//! truth for the percentage and the flat minimum. All rounding happens here,
//! once, at quote time; downstream code never re-rounds.

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Currencies the product currently supports.
pub const SUPPORTED_CURRENCIES: &[&str] = &["USD", "EUR", "GBP", "NGN", "KES", "GHS", "JPY"];

/// Minor-unit precision for a currency (decimal places of its smallest unit).
pub fn minor_units(currency: &str) -> i64 {
    match currency {
        "JPY" => 0,
        _ => 2,
    }
}

/// Transfer fee schedule: fee = max(percent * send_amount, flat_minimum).
///
/// `percent` is a decimal fraction (0.02 = 2%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub percent: BigDecimal,
    pub flat_minimum: BigDecimal,
}

impl FeeSchedule {
    pub fn new(percent: BigDecimal, flat_minimum: BigDecimal) -> Self {
        Self {
            percent,
            flat_minimum,
        }
    }
}

/// A locked quote: send amount, fee and total payable computed at creation
/// time, together with the captured exchange rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub send_amount: BigDecimal,
    pub transfer_fee: BigDecimal,
    pub total_payable: BigDecimal,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: BigDecimal,
    pub rate_captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuoteError {
    #[error("send amount must be greater than zero")]
    NonPositiveAmount,

    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

fn check_currency(code: &str) -> Result<(), QuoteError> {
    if SUPPORTED_CURRENCIES.contains(&code) {
        Ok(())
    } else {
        Err(QuoteError::UnsupportedCurrency(code.to_string()))
    }
}

/// Compute the transfer fee for `send_amount`, rounded half-up to the
/// currency's minor-unit precision. Rejects non-positive amounts.
pub fn compute_fee(
    send_amount: &BigDecimal,
    currency: &str,
    schedule: &FeeSchedule,
) -> Result<BigDecimal, QuoteError> {
    check_currency(currency)?;
    if send_amount <= &BigDecimal::from(0) {
        return Err(QuoteError::NonPositiveAmount);
    }

    let percentage_fee = &schedule.percent * send_amount;
    let fee = percentage_fee.max(schedule.flat_minimum.clone());
    Ok(fee.with_scale_round(minor_units(currency), RoundingMode::HalfUp))
}

/// Build a complete quote from a send amount, captured rate and schedule.
pub fn build_quote(
    send_amount: BigDecimal,
    from_currency: &str,
    to_currency: &str,
    rate: BigDecimal,
    rate_captured_at: DateTime<Utc>,
    schedule: &FeeSchedule,
) -> Result<Quote, QuoteError> {
    check_currency(to_currency)?;
    let transfer_fee = compute_fee(&send_amount, from_currency, schedule)?;
    let send_amount = send_amount.with_scale_round(minor_units(from_currency), RoundingMode::HalfUp);
    let total_payable = &send_amount + &transfer_fee;

    Ok(Quote {
        send_amount,
        transfer_fee,
        total_payable,
        from_currency: from_currency.to_string(),
        to_currency: to_currency.to_string(),
        rate,
        rate_captured_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn schedule() -> FeeSchedule {
        FeeSchedule::new(dec("0.02"), dec("10.00"))
    }

    #[test]
    fn percentage_fee_wins_over_flat_minimum() {
        let fee = compute_fee(&dec("1000.00"), "USD", &schedule()).unwrap();
        assert_eq!(fee, dec("20.00"));
    }

    #[test]
    fn flat_minimum_wins_for_small_amounts() {
        let fee = compute_fee(&dec("100.00"), "USD", &schedule()).unwrap();
        assert_eq!(fee, dec("10.00"));
    }

    #[test]
    fn fee_rounds_half_up_at_minor_units() {
        // 2% of 123.45 = 2.469 -> 2.47
        let schedule = FeeSchedule::new(dec("0.02"), dec("1.00"));
        assert_eq!(
            compute_fee(&dec("123.45"), "USD", &schedule).unwrap(),
            dec("2.47")
        );
        // 2% of 100.25 = 2.005 -> 2.01 (half-up, not banker's)
        assert_eq!(
            compute_fee(&dec("100.25"), "USD", &schedule).unwrap(),
            dec("2.01")
        );
    }

    #[test]
    fn jpy_rounds_to_whole_units() {
        let schedule = FeeSchedule::new(dec("0.02"), dec("1"));
        // 2% of 10025 = 200.5 -> 201
        assert_eq!(
            compute_fee(&dec("10025"), "JPY", &schedule).unwrap(),
            dec("201")
        );
    }

    #[test]
    fn rejects_non_positive_amounts() {
        assert_eq!(
            compute_fee(&dec("0"), "USD", &schedule()),
            Err(QuoteError::NonPositiveAmount)
        );
        assert_eq!(
            compute_fee(&dec("-5.00"), "USD", &schedule()),
            Err(QuoteError::NonPositiveAmount)
        );
    }

    #[test]
    fn rejects_unsupported_currencies() {
        assert_eq!(
            compute_fee(&dec("100"), "XAU", &schedule()),
            Err(QuoteError::UnsupportedCurrency("XAU".to_string()))
        );
        assert!(build_quote(
            dec("100"),
            "USD",
            "XAU",
            dec("1"),
            Utc::now(),
            &schedule()
        )
        .is_err());
    }

    #[test]
    fn total_payable_is_send_plus_fee_and_stable() {
        let s = schedule();
        let first = build_quote(dec("250.00"), "USD", "NGN", dec("1500"), Utc::now(), &s).unwrap();
        assert_eq!(
            first.total_payable,
            &first.send_amount + &first.transfer_fee
        );

        let second = build_quote(dec("250.00"), "USD", "NGN", dec("1500"), Utc::now(), &s).unwrap();
        assert_eq!(first.transfer_fee, second.transfer_fee);
        assert_eq!(first.total_payable, second.total_payable);
    }
}
