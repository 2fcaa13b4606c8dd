//! Environment-driven configuration tests
//!
//! These mutate process environment variables, so each runs under `#[serial]`.

use atcsim::config::{Config, DelayPolicy, ReportFormat, TierPolicy};
use atcsim::error::ConfigError;
use atcsim::models::ResourceKind;
use serial_test::serial;
use std::time::Duration;

const KEYS: &[&str] = &[
    "RUNWAYS",
    "GATES",
    "TOWER_SLOTS",
    "TOWER_TIERS",
    "ATTEMPT_TIMEOUT_MS",
    "ALERT_THRESHOLD_SECS",
    "CRASH_THRESHOLD_SECS",
    "OPERATION_BASE_MS",
    "BACKOFF_MODE",
    "BACKOFF_MIN_MS",
    "BACKOFF_MAX_MS",
    "ARRIVAL_MIN_MS",
    "ARRIVAL_MAX_MS",
    "SIMULATION_SECS",
    "MAX_FLIGHTS",
    "INTERNATIONAL_RATIO",
    "REPORT_FORMAT",
    "LOG_FORMAT",
];

fn clear_env() {
    for key in KEYS {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    let config = Config::from_env().unwrap();

    assert_eq!(config.capacity(ResourceKind::Runway), 3);
    assert_eq!(config.capacity(ResourceKind::Gate), 5);
    assert_eq!(config.capacity(ResourceKind::Tower), 2);
    assert_eq!(config.tier_policy(ResourceKind::Tower), TierPolicy::ThreeTier);
    assert_eq!(config.timing.attempt_timeout, Duration::from_secs(1));
    assert_eq!(config.timing.crash_threshold, Duration::from_secs(15));
    assert_eq!(config.report_format, ReportFormat::Text);
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    std::env::set_var("RUNWAYS", "1");
    std::env::set_var("TOWER_TIERS", "2");
    std::env::set_var("BACKOFF_MODE", "fixed");
    std::env::set_var("BACKOFF_MIN_MS", "750");
    std::env::set_var("REPORT_FORMAT", "json");

    let config = Config::from_env().unwrap();
    assert_eq!(config.runways, 1);
    assert_eq!(config.tier_policy(ResourceKind::Tower), TierPolicy::TwoTier);
    assert_eq!(config.tier_policy(ResourceKind::Runway), TierPolicy::ThreeTier);
    assert_eq!(config.backoff, DelayPolicy::Fixed(Duration::from_millis(750)));
    assert_eq!(config.report_format, ReportFormat::Json);

    clear_env();
}

#[test]
#[serial]
fn test_from_env_invalid_number_returns_error() {
    clear_env();
    std::env::set_var("TOWER_SLOTS", "two");

    let result = std::panic::catch_unwind(Config::from_env);
    assert!(result.is_ok(), "Config::from_env must not panic on a malformed value");
    match result.unwrap() {
        Err(ConfigError::InvalidValue { key, value }) => {
            assert_eq!(key, "TOWER_SLOTS");
            assert_eq!(value, "two");
        }
        other => panic!("expected InvalidValue, got {other:?}"),
    }

    clear_env();
}

#[test]
#[serial]
fn test_from_env_rejects_inverted_thresholds() {
    clear_env();
    std::env::set_var("ALERT_THRESHOLD_SECS", "20");
    std::env::set_var("CRASH_THRESHOLD_SECS", "20");

    let err = Config::from_env().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::ThresholdOrder {
            alert_secs: 20,
            crash_secs: 20
        }
    ));

    clear_env();
}

#[test]
#[serial]
fn test_from_env_rejects_overflowing_durations() {
    for key in ["SIMULATION_SECS", "OPERATION_BASE_MS", "ATTEMPT_TIMEOUT_MS"] {
        clear_env();
        std::env::set_var(key, u64::MAX.to_string());

        let result = std::panic::catch_unwind(Config::from_env);
        assert!(result.is_ok(), "Config::from_env must not panic on {key}");
        match result.unwrap() {
            Err(ConfigError::OutOfRange { key: rejected, value, .. }) => {
                assert_eq!(rejected, key);
                assert_eq!(value, u64::MAX);
            }
            other => panic!("{key}: expected OutOfRange, got {other:?}"),
        }
    }
    clear_env();
}
