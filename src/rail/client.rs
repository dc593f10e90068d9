//! HTTP client for the payment rail.
//!
//! Two calls matter to the core: issuing a single-use virtual collection
//! account for a transfer, and listing inbound payments observed for a
//! reference. Both carry an explicit timeout and run behind a circuit
//! breaker; a timeout is a transient failure, never a "no payment" signal.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RailError {
    #[error("rail request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("rail error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("rail rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid response from rail: {0}")]
    InvalidResponse(String),

    #[error("rail circuit breaker open")]
    CircuitOpen,
}

impl RailError {
    /// Retry hint: transient errors are safe to retry with backoff,
    /// everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            RailError::Request(e) => !e.is_decode(),
            RailError::Upstream { .. } | RailError::CircuitOpen => true,
            RailError::Rejected { .. } | RailError::InvalidResponse(_) => false,
        }
    }
}

/// Response from the rail's virtual account endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualAccountResponse {
    pub account_number: String,
    pub bank_name: String,
    pub provider: String,
    pub reference: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Received,
    Reversed,
}

/// One inbound payment observed for a reference. Fixed schema; the rail's
/// reversal/chargeback signal arrives as `state = "reversed"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundPayment {
    pub amount: BigDecimal,
    pub currency: String,
    pub received_at: DateTime<Utc>,
    pub state: PaymentState,
}

#[derive(Debug, Serialize)]
struct IssueRequest {
    transaction_id: Uuid,
    amount: BigDecimal,
    currency: String,
    reference: String,
}

/// Outbound interface to the payment rail, as seen by the services.
#[async_trait]
pub trait PaymentRail: Send + Sync {
    async fn issue_virtual_account(
        &self,
        transfer_id: Uuid,
        amount: &BigDecimal,
        currency: &str,
        reference: &str,
    ) -> Result<VirtualAccountResponse, RailError>;

    async fn inbound_payments(&self, reference: &str) -> Result<Vec<InboundPayment>, RailError>;
}

/// HTTP implementation of [`PaymentRail`].
#[derive(Clone)]
pub struct RailClient {
    client: Client,
    base_url: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl RailClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self::with_circuit_breaker(base_url, timeout, 3, 60)
    }

    pub fn with_circuit_breaker(
        base_url: String,
        timeout: Duration,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        RailClient {
            client,
            base_url,
            circuit_breaker,
        }
    }

    pub fn circuit_state(&self) -> &'static str {
        if self.circuit_breaker.is_call_permitted() {
            "closed"
        } else {
            "open"
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RailError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            Err(RailError::Upstream {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(RailError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl PaymentRail for RailClient {
    async fn issue_virtual_account(
        &self,
        transfer_id: Uuid,
        amount: &BigDecimal,
        currency: &str,
        reference: &str,
    ) -> Result<VirtualAccountResponse, RailError> {
        let url = format!("{}/virtual-accounts", self.base_url.trim_end_matches('/'));
        let client = self.client.clone();
        let body = IssueRequest {
            transaction_id: transfer_id,
            amount: amount.clone(),
            currency: currency.to_string(),
            reference: reference.to_string(),
        };

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client.post(&url).json(&body).send().await?;
                let response = Self::check_status(response).await?;
                let account = response.json::<VirtualAccountResponse>().await?;
                Ok(account)
            })
            .await;

        match result {
            Ok(account) => Ok(account),
            Err(FailsafeError::Rejected) => Err(RailError::CircuitOpen),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }

    async fn inbound_payments(&self, reference: &str) -> Result<Vec<InboundPayment>, RailError> {
        let url = format!("{}/payments", self.base_url.trim_end_matches('/'));
        let client = self.client.clone();
        let reference = reference.to_string();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .get(&url)
                    .query(&[("reference", reference.as_str())])
                    .send()
                    .await?;
                let response = Self::check_status(response).await?;
                let payments = response.json::<Vec<InboundPayment>>().await?;
                Ok(payments)
            })
            .await;

        match result {
            Ok(payments) => Ok(payments),
            Err(FailsafeError::Rejected) => Err(RailError::CircuitOpen),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn client(url: String) -> RailClient {
        RailClient::new(url, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn issues_a_virtual_account() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/virtual-accounts")
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "account_number": "9923001122",
                    "bank_name": "Wema Bank",
                    "provider": "rail",
                    "reference": "CT-ABC123",
                    "expires_at": "2026-01-01T00:30:00Z"
                }"#,
            )
            .create_async()
            .await;

        let account = client(server.url())
            .issue_virtual_account(
                Uuid::new_v4(),
                &BigDecimal::from_str("102.00").unwrap(),
                "USD",
                "CT-ABC123",
            )
            .await
            .unwrap();

        assert_eq!(account.account_number, "9923001122");
        assert_eq!(account.reference, "CT-ABC123");
    }

    #[tokio::test]
    async fn client_rejection_is_permanent() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/virtual-accounts")
            .with_status(422)
            .with_body("unsupported currency")
            .create_async()
            .await;

        let err = client(server.url())
            .issue_virtual_account(
                Uuid::new_v4(),
                &BigDecimal::from_str("102.00").unwrap(),
                "USD",
                "CT-ABC123",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RailError::Rejected { status: 422, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn lists_inbound_payments() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/payments?reference=CT-ABC123")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{
                    "amount": "102.00",
                    "currency": "USD",
                    "received_at": "2026-01-01T00:10:00Z",
                    "state": "received"
                }]"#,
            )
            .create_async()
            .await;

        let payments = client(server.url())
            .inbound_payments("CT-ABC123")
            .await
            .unwrap();

        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].state, PaymentState::Received);
        assert_eq!(payments[0].amount, BigDecimal::from_str("102.00").unwrap());
    }

    #[tokio::test]
    async fn empty_payment_list_is_ok() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/payments?reference=CT-NONE")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let payments = client(server.url()).inbound_payments("CT-NONE").await.unwrap();
        assert!(payments.is_empty());
    }

    #[tokio::test]
    async fn server_errors_are_transient_and_trip_the_breaker() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Regex(r"/payments.*".into()))
            .with_status(500)
            .expect_at_least(3)
            .create_async()
            .await;

        let client = RailClient::with_circuit_breaker(server.url(), Duration::from_secs(5), 3, 60);

        for _ in 0..3 {
            let err = client.inbound_payments("CT-ABC123").await.unwrap_err();
            assert!(err.is_transient());
        }

        let err = client.inbound_payments("CT-ABC123").await.unwrap_err();
        assert!(matches!(err, RailError::CircuitOpen));
        assert_eq!(client.circuit_state(), "open");
    }
}
