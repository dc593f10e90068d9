//! Postgres implementation of TransferRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{Transfer, TransferStatus};
use crate::ports::{RepositoryError, RepositoryResult, TransferRepository};

const ALL_COLUMNS: &str = "id, user_id, recipient_id, send_amount, transfer_fee, total_payable, \
     from_currency, to_currency, exchange_rate, rate_captured_at, status, virtual_account, \
     created_at, completed_at, expires_at, reconciliation_history, status_history";

/// Postgres-backed transfer repository.
#[derive(Clone)]
pub struct PostgresTransferRepository {
    pool: PgPool,
}

impl PostgresTransferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransferRepository for PostgresTransferRepository {
    async fn insert(&self, transfer: &Transfer) -> RepositoryResult<Transfer> {
        let row = sqlx::query_as::<_, TransferRow>(&format!(
            r#"
            INSERT INTO transfers (
                id, user_id, recipient_id, send_amount, transfer_fee, total_payable,
                from_currency, to_currency, exchange_rate, rate_captured_at, status,
                virtual_account, created_at, completed_at, expires_at,
                reconciliation_history, status_history
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {ALL_COLUMNS}
            "#
        ))
        .bind(transfer.id)
        .bind(transfer.user_id)
        .bind(transfer.recipient_id)
        .bind(&transfer.send_amount)
        .bind(&transfer.transfer_fee)
        .bind(&transfer.total_payable)
        .bind(&transfer.from_currency)
        .bind(&transfer.to_currency)
        .bind(&transfer.exchange_rate)
        .bind(transfer.rate_captured_at)
        .bind(transfer.status.as_str())
        .bind(to_json(&transfer.virtual_account)?)
        .bind(transfer.created_at)
        .bind(transfer.completed_at)
        .bind(transfer.expires_at)
        .bind(to_json(&transfer.reconciliation_history)?)
        .bind(to_json(&transfer.status_history)?)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.into_domain()
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Transfer> {
        let row = sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {ALL_COLUMNS} FROM transfers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(id.to_string()))?
            .into_domain()
    }

    async fn find_by_reference(&self, reference: &str) -> RepositoryResult<Transfer> {
        let row = sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {ALL_COLUMNS} FROM transfers WHERE virtual_account->>'reference' = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(reference.to_string()))?
            .into_domain()
    }

    async fn update(&self, transfer: &Transfer) -> RepositoryResult<Transfer> {
        let row = sqlx::query_as::<_, TransferRow>(&format!(
            r#"
            UPDATE transfers SET
                status = $2,
                virtual_account = $3,
                completed_at = $4,
                reconciliation_history = $5,
                status_history = $6
            WHERE id = $1
            RETURNING {ALL_COLUMNS}
            "#
        ))
        .bind(transfer.id)
        .bind(transfer.status.as_str())
        .bind(to_json(&transfer.virtual_account)?)
        .bind(transfer.completed_at)
        .bind(to_json(&transfer.reconciliation_history)?)
        .bind(to_json(&transfer.status_history)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(transfer.id.to_string()))?
            .into_domain()
    }

    async fn list(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<Transfer>> {
        let rows = sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {ALL_COLUMNS} FROM transfers ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        rows.into_iter().map(TransferRow::into_domain).collect()
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<Transfer>> {
        let rows = sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {ALL_COLUMNS} FROM transfers WHERE status = $1 AND expires_at <= $2"
        ))
        .bind(TransferStatus::PendingPayment.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        rows.into_iter().map(TransferRow::into_domain).collect()
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> RepositoryResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| RepositoryError::Storage(e.to_string()))
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransferRow {
    id: Uuid,
    user_id: Uuid,
    recipient_id: Uuid,
    send_amount: bigdecimal::BigDecimal,
    transfer_fee: bigdecimal::BigDecimal,
    total_payable: bigdecimal::BigDecimal,
    from_currency: String,
    to_currency: String,
    exchange_rate: bigdecimal::BigDecimal,
    rate_captured_at: DateTime<Utc>,
    status: String,
    virtual_account: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    reconciliation_history: serde_json::Value,
    status_history: serde_json::Value,
}

impl TransferRow {
    fn into_domain(self) -> RepositoryResult<Transfer> {
        let status = TransferStatus::from_str(&self.status)
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        let virtual_account = match self.virtual_account {
            Some(value) if !value.is_null() => Some(
                serde_json::from_value(value)
                    .map_err(|e| RepositoryError::Storage(e.to_string()))?,
            ),
            _ => None,
        };
        let reconciliation_history = serde_json::from_value(self.reconciliation_history)
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        let status_history = serde_json::from_value(self.status_history)
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(Transfer {
            id: self.id,
            user_id: self.user_id,
            recipient_id: self.recipient_id,
            send_amount: self.send_amount,
            transfer_fee: self.transfer_fee,
            total_payable: self.total_payable,
            from_currency: self.from_currency,
            to_currency: self.to_currency,
            exchange_rate: self.exchange_rate,
            rate_captured_at: self.rate_captured_at,
            status,
            virtual_account,
            created_at: self.created_at,
            completed_at: self.completed_at,
            expires_at: self.expires_at,
            reconciliation_history,
            status_history,
        })
    }
}
