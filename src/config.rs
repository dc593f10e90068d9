use bigdecimal::BigDecimal;
use dotenvy::dotenv;
use std::env;

use crate::domain::FeeSchedule;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub rail_base_url: String,
    pub rates_base_url: String,
    pub rail_webhook_secret: String,
    /// Fee as a decimal fraction of the send amount (0.02 = 2%).
    pub fee_percent: BigDecimal,
    pub fee_flat_minimum: BigDecimal,
    /// How long a transfer waits for funding before expiring.
    pub transfer_ttl_minutes: i64,
    /// Tolerance when comparing received against expected amounts.
    pub reconcile_epsilon: BigDecimal,
    pub expiry_sweep_secs: u64,
    pub rail_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            rail_base_url: env::var("RAIL_BASE_URL")?,
            rates_base_url: env::var("RATES_BASE_URL")?,
            rail_webhook_secret: env::var("RAIL_WEBHOOK_SECRET")?,
            fee_percent: parse_decimal("FEE_PERCENT", "0.02")?,
            fee_flat_minimum: parse_decimal("FEE_FLAT_MINIMUM", "10.00")?,
            transfer_ttl_minutes: env::var("TRANSFER_TTL_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            reconcile_epsilon: parse_decimal("RECONCILE_EPSILON", "0.01")?,
            expiry_sweep_secs: env::var("EXPIRY_SWEEP_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,
            rail_timeout_secs: env::var("RAIL_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
        })
    }

    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule::new(self.fee_percent.clone(), self.fee_flat_minimum.clone())
    }
}

fn parse_decimal(key: &str, default: &str) -> anyhow::Result<BigDecimal> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse::<BigDecimal>()
        .map_err(|e| anyhow::anyhow!("{} is not a valid decimal: {}", key, e))
}
