//! Exchange rate provider client.
//!
//! Quoting fails closed: if no rate can be fetched, no transfer is created.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RateError {
    #[error("rate request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("rate unavailable for {0}/{1}")]
    Unavailable(String, String),
}

impl RateError {
    pub fn is_transient(&self) -> bool {
        match self {
            RateError::Request(e) => !e.is_decode(),
            RateError::Unavailable(_, _) => false,
        }
    }
}

/// A currency-pair rate with its capture timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateQuote {
    pub rate: BigDecimal,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<RateQuote, RateError>;
}

/// HTTP implementation of [`RateSource`].
#[derive(Clone)]
pub struct RateClient {
    client: Client,
    base_url: String,
}

impl RateClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();
        Self { client, base_url }
    }
}

#[async_trait]
impl RateSource for RateClient {
    async fn get_rate(&self, from: &str, to: &str) -> Result<RateQuote, RateError> {
        let url = format!("{}/rates", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("from", from), ("to", to)])
            .send()
            .await?;

        if response.status() == 404 {
            return Err(RateError::Unavailable(from.to_string(), to.to_string()));
        }
        let response = response.error_for_status()?;
        let quote = response.json::<RateQuote>().await?;
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn fetches_a_rate_with_timestamp() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rates?from=USD&to=NGN")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"rate": "1515.25", "timestamp": "2026-01-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let client = RateClient::new(server.url(), Duration::from_secs(5));
        let quote = client.get_rate("USD", "NGN").await.unwrap();
        assert_eq!(quote.rate, BigDecimal::from_str("1515.25").unwrap());
    }

    #[tokio::test]
    async fn missing_pair_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rates?from=USD&to=KES")
            .with_status(404)
            .create_async()
            .await;

        let client = RateClient::new(server.url(), Duration::from_secs(5));
        let err = client.get_rate("USD", "KES").await.unwrap_err();
        assert!(matches!(err, RateError::Unavailable(_, _)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn connection_failure_is_transient() {
        // Port from a dropped listener: connections are refused.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = RateClient::new(url, Duration::from_secs(1));
        let err = client.get_rate("USD", "NGN").await.unwrap_err();
        assert!(err.is_transient());
    }
}
