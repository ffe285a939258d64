use std::str::FromStr;

use chrono::Weekday;
use rust_decimal::Decimal;

use crate::app_config::{AppConfig, Environment, SequenceFallback};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files; use it when
/// the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the real environment so tests can
/// drive them with a plain `HashMap`.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_rate = |var: &str, default: &str| -> Result<Decimal, ConfigError> {
        let rate = Decimal::from_str(or_default(var, default).trim())
            .map_err(|e| invalid(var, e.to_string()))?;
        if rate.is_sign_negative() && !rate.is_zero() {
            return Err(invalid(var, format!("rate must be non-negative, got {rate}")));
        }
        Ok(rate)
    };

    let env = parse_environment(&or_default("SCANQ_ENV", "development"))?;

    let bind_addr = or_default("SCANQ_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("SCANQ_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("SCANQ_LOG_LEVEL", "info");
    let clients_path = PathBuf::from(or_default("SCANQ_CLIENTS_PATH", "./config/clients.yaml"));

    let approved_rate = parse_rate("SCANQ_APPROVED_RATE", "0.50")?;
    let partial_rate = parse_rate("SCANQ_PARTIAL_RATE", "0.25")?;

    let week_start = Weekday::from_str(or_default("SCANQ_WEEK_START", "monday").trim())
        .map_err(|_| invalid("SCANQ_WEEK_START", "expected a weekday name".to_string()))?;
    let sequence_fallback =
        parse_sequence_fallback(&or_default("SCANQ_SEQUENCE_FALLBACK", "row-position"))?;

    let cache_ttl_secs = parse_u64("SCANQ_CACHE_TTL_SECS", "60")?;
    let sheets_request_timeout_secs = parse_u64("SCANQ_SHEETS_REQUEST_TIMEOUT_SECS", "30")?;
    if sheets_request_timeout_secs == 0 {
        return Err(invalid(
            "SCANQ_SHEETS_REQUEST_TIMEOUT_SECS",
            "timeout must be greater than zero".to_string(),
        ));
    }
    let sheets_user_agent = or_default("SCANQ_SHEETS_USER_AGENT", "scanq/0.1 (scan-quality)");
    let sheets_max_retries = parse_u32("SCANQ_SHEETS_MAX_RETRIES", "0")?;
    let sheets_retry_backoff_base_ms = parse_u64("SCANQ_SHEETS_RETRY_BACKOFF_BASE_MS", "500")?;
    let google_api_key = lookup("SCANQ_GOOGLE_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        clients_path,
        approved_rate,
        partial_rate,
        week_start,
        sequence_fallback,
        cache_ttl_secs,
        sheets_request_timeout_secs,
        sheets_user_agent,
        sheets_max_retries,
        sheets_retry_backoff_base_ms,
        google_api_key,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SCANQ_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

fn parse_sequence_fallback(s: &str) -> Result<SequenceFallback, ConfigError> {
    match s.trim() {
        "zero" => Ok(SequenceFallback::Zero),
        "row-position" => Ok(SequenceFallback::RowPosition),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SCANQ_SEQUENCE_FALLBACK".to_string(),
            reason: format!("expected zero or row-position; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
