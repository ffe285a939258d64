use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

fn empty_env<'a>() -> HashMap<&'a str, &'a str> {
    HashMap::new()
}

#[test]
fn parse_environment_development() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
}

#[test]
fn parse_environment_test() {
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
}

#[test]
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("unknown").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "SCANQ_ENV"));
}

#[test]
fn build_app_config_succeeds_with_empty_env() {
    let map = empty_env();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(
        cfg.clients_path,
        std::path::PathBuf::from("./config/clients.yaml")
    );
    assert_eq!(cfg.approved_rate, Decimal::new(50, 2));
    assert_eq!(cfg.partial_rate, Decimal::new(25, 2));
    assert_eq!(cfg.week_start, Weekday::Mon);
    assert_eq!(cfg.sequence_fallback, SequenceFallback::RowPosition);
    assert_eq!(cfg.cache_ttl_secs, 60);
    assert_eq!(cfg.sheets_request_timeout_secs, 30);
    assert_eq!(cfg.sheets_user_agent, "scanq/0.1 (scan-quality)");
    assert_eq!(cfg.sheets_max_retries, 0);
    assert_eq!(cfg.sheets_retry_backoff_base_ms, 500);
    assert!(cfg.google_api_key.is_none());
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    let mut map = empty_env();
    map.insert("SCANQ_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SCANQ_BIND_ADDR"),
        "expected InvalidEnvVar(SCANQ_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn build_app_config_fails_on_invalid_scanq_env() {
    let mut map = empty_env();
    map.insert("SCANQ_ENV", "producton");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SCANQ_ENV"),
        "expected InvalidEnvVar(SCANQ_ENV), got: {result:?}"
    );
}

#[test]
fn rates_override() {
    let mut map = empty_env();
    map.insert("SCANQ_APPROVED_RATE", "1.10");
    map.insert("SCANQ_PARTIAL_RATE", " 0.40 ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.approved_rate, Decimal::new(110, 2));
    assert_eq!(cfg.partial_rate, Decimal::new(40, 2));
    assert_eq!(cfg.rates().approved, Decimal::new(110, 2));
}

#[test]
fn rates_reject_non_numeric() {
    let mut map = empty_env();
    map.insert("SCANQ_APPROVED_RATE", "half a euro");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SCANQ_APPROVED_RATE"),
        "expected InvalidEnvVar(SCANQ_APPROVED_RATE), got: {result:?}"
    );
}

#[test]
fn rates_reject_negative() {
    let mut map = empty_env();
    map.insert("SCANQ_PARTIAL_RATE", "-0.25");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SCANQ_PARTIAL_RATE"),
        "expected InvalidEnvVar(SCANQ_PARTIAL_RATE), got: {result:?}"
    );
}

#[test]
fn rates_accept_zero() {
    let mut map = empty_env();
    map.insert("SCANQ_APPROVED_RATE", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.approved_rate.is_zero());
}

#[test]
fn week_start_override() {
    let mut map = empty_env();
    map.insert("SCANQ_WEEK_START", "sunday");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.week_start, Weekday::Sun);
}

#[test]
fn week_start_invalid() {
    let mut map = empty_env();
    map.insert("SCANQ_WEEK_START", "someday");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SCANQ_WEEK_START"),
        "expected InvalidEnvVar(SCANQ_WEEK_START), got: {result:?}"
    );
}

#[test]
fn sequence_fallback_zero() {
    let mut map = empty_env();
    map.insert("SCANQ_SEQUENCE_FALLBACK", "zero");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.sequence_fallback, SequenceFallback::Zero);
}

#[test]
fn sequence_fallback_invalid() {
    let mut map = empty_env();
    map.insert("SCANQ_SEQUENCE_FALLBACK", "index");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SCANQ_SEQUENCE_FALLBACK"),
        "expected InvalidEnvVar(SCANQ_SEQUENCE_FALLBACK), got: {result:?}"
    );
}

#[test]
fn cache_ttl_secs_override() {
    let mut map = empty_env();
    map.insert("SCANQ_CACHE_TTL_SECS", "300");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.cache_ttl_secs, 300);
}

#[test]
fn cache_ttl_secs_invalid() {
    let mut map = empty_env();
    map.insert("SCANQ_CACHE_TTL_SECS", "a minute");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SCANQ_CACHE_TTL_SECS"),
        "expected InvalidEnvVar(SCANQ_CACHE_TTL_SECS), got: {result:?}"
    );
}

#[test]
fn sheets_request_timeout_secs_override() {
    let mut map = empty_env();
    map.insert("SCANQ_SHEETS_REQUEST_TIMEOUT_SECS", "60");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.sheets_request_timeout_secs, 60);
}

#[test]
fn sheets_request_timeout_secs_rejects_zero() {
    let mut map = empty_env();
    map.insert("SCANQ_SHEETS_REQUEST_TIMEOUT_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SCANQ_SHEETS_REQUEST_TIMEOUT_SECS"),
        "expected InvalidEnvVar(SCANQ_SHEETS_REQUEST_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn sheets_user_agent_override() {
    let mut map = empty_env();
    map.insert("SCANQ_SHEETS_USER_AGENT", "custom-agent/2.0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.sheets_user_agent, "custom-agent/2.0");
}

#[test]
fn sheets_max_retries_override() {
    let mut map = empty_env();
    map.insert("SCANQ_SHEETS_MAX_RETRIES", "3");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.sheets_max_retries, 3);
}

#[test]
fn sheets_max_retries_invalid() {
    let mut map = empty_env();
    map.insert("SCANQ_SHEETS_MAX_RETRIES", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SCANQ_SHEETS_MAX_RETRIES"),
        "expected InvalidEnvVar(SCANQ_SHEETS_MAX_RETRIES), got: {result:?}"
    );
}

#[test]
fn sheets_retry_backoff_base_ms_override() {
    let mut map = empty_env();
    map.insert("SCANQ_SHEETS_RETRY_BACKOFF_BASE_MS", "1000");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.sheets_retry_backoff_base_ms, 1000);
}

#[test]
fn google_api_key_present() {
    let mut map = empty_env();
    map.insert("SCANQ_GOOGLE_API_KEY", "AIza-test");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.google_api_key.as_deref(), Some("AIza-test"));
}

#[test]
fn google_api_key_blank_is_none() {
    let mut map = empty_env();
    map.insert("SCANQ_GOOGLE_API_KEY", "   ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.google_api_key.is_none());
}

#[test]
fn debug_output_redacts_google_api_key() {
    let mut map = empty_env();
    map.insert("SCANQ_GOOGLE_API_KEY", "AIza-secret");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let debug = format!("{cfg:?}");
    assert!(!debug.contains("AIza-secret"));
    assert!(debug.contains("[redacted]"));
}
