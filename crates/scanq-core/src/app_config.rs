use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Weekday;
use rust_decimal::Decimal;

use crate::records::PaymentRates;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// What a record gets as its sequence number when the identifier has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceFallback {
    /// Every record without a number gets `0`.
    Zero,
    /// When no row in the batch carries a number, records are numbered by
    /// their 1-based row position; otherwise behaves like [`Self::Zero`].
    #[default]
    RowPosition,
}

impl std::fmt::Display for SequenceFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceFallback::Zero => write!(f, "zero"),
            SequenceFallback::RowPosition => write!(f, "row-position"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub clients_path: PathBuf,
    pub approved_rate: Decimal,
    pub partial_rate: Decimal,
    pub week_start: Weekday,
    pub sequence_fallback: SequenceFallback,
    pub cache_ttl_secs: u64,
    pub sheets_request_timeout_secs: u64,
    pub sheets_user_agent: String,
    pub sheets_max_retries: u32,
    pub sheets_retry_backoff_base_ms: u64,
    pub google_api_key: Option<String>,
}

impl AppConfig {
    /// Default payment rates, before any per-client override.
    #[must_use]
    pub fn rates(&self) -> PaymentRates {
        PaymentRates {
            approved: self.approved_rate,
            partial: self.partial_rate,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("clients_path", &self.clients_path)
            .field("approved_rate", &self.approved_rate)
            .field("partial_rate", &self.partial_rate)
            .field("week_start", &self.week_start)
            .field("sequence_fallback", &self.sequence_fallback)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field(
                "sheets_request_timeout_secs",
                &self.sheets_request_timeout_secs,
            )
            .field("sheets_user_agent", &self.sheets_user_agent)
            .field("sheets_max_retries", &self.sheets_max_retries)
            .field(
                "sheets_retry_backoff_base_ms",
                &self.sheets_retry_backoff_base_ms,
            )
            .field(
                "google_api_key",
                &self.google_api_key.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}
