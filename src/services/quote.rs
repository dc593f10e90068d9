//! Quote computation and transfer creation.

use arc_swap::ArcSwap;
use bigdecimal::BigDecimal;
use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::quote::{build_quote, FeeSchedule, Quote};
use crate::domain::{Clock, Transfer};
use crate::error::AppError;
use crate::ports::TransferRepository;
use crate::rail::RateSource;

/// Input for creating a transfer from a user's send intent.
#[derive(Debug, Clone)]
pub struct CreateTransferInput {
    pub user_id: Uuid,
    pub recipient_id: Uuid,
    pub send_amount: BigDecimal,
    pub from_currency: String,
    pub to_currency: String,
}

/// Computes quotes and creates transfers in CREATED.
///
/// The fee schedule lives behind an `ArcSwap` so operators can replace it
/// without a restart; a transfer always uses the schedule in force at its
/// creation instant and is never re-quoted.
#[derive(Clone)]
pub struct QuoteService {
    repo: Arc<dyn TransferRepository>,
    rates: Arc<dyn RateSource>,
    schedule: Arc<ArcSwap<FeeSchedule>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl QuoteService {
    pub fn new(
        repo: Arc<dyn TransferRepository>,
        rates: Arc<dyn RateSource>,
        schedule: Arc<ArcSwap<FeeSchedule>>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            repo,
            rates,
            schedule,
            clock,
            ttl,
        }
    }

    /// Compute a quote without persisting anything. Fails closed when no
    /// rate is available.
    pub async fn preview(
        &self,
        send_amount: BigDecimal,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<Quote, AppError> {
        let rate = self.rates.get_rate(from_currency, to_currency).await?;
        let schedule = self.schedule.load_full();
        let quote = build_quote(
            send_amount,
            from_currency,
            to_currency,
            rate.rate,
            rate.timestamp,
            &schedule,
        )?;
        Ok(quote)
    }

    /// Create a transfer with a locked quote. The transfer starts in CREATED;
    /// issuing its virtual account is a separate, retryable step.
    pub async fn create_transfer(&self, input: CreateTransferInput) -> Result<Transfer, AppError> {
        let quote = self
            .preview(input.send_amount, &input.from_currency, &input.to_currency)
            .await?;

        let transfer = Transfer::new(
            input.user_id,
            input.recipient_id,
            quote,
            self.clock.now(),
            self.ttl,
        );
        let inserted = self.repo.insert(&transfer).await?;

        tracing::info!(
            transfer_id = %inserted.id,
            total_payable = %inserted.total_payable,
            currency = %inserted.from_currency,
            "transfer created"
        );
        Ok(inserted)
    }
}
