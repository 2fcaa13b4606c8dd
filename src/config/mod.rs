use rand::Rng;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::resource::ResourceKind;

pub const DEFAULT_RUNWAYS: u32 = 3;
pub const DEFAULT_GATES: u32 = 5;
pub const DEFAULT_TOWER_SLOTS: u32 = 2;
pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_ALERT_THRESHOLD_SECS: u64 = 10;
pub const DEFAULT_CRASH_THRESHOLD_SECS: u64 = 15;
pub const DEFAULT_OPERATION_BASE_MS: u64 = 2000;
pub const DEFAULT_SIMULATION_SECS: u64 = 60;
pub const DEFAULT_MAX_FLIGHTS: u32 = 200;
pub const DEFAULT_INTERNATIONAL_RATIO: f64 = 1.0 / 3.0;

/// Upper bound for every millisecond delay (timeouts, holds, backoff, arrivals).
pub const MAX_DELAY_MS: u64 = 3_600_000;
/// Upper bound for the arrival window and the wait thresholds.
pub const MAX_WINDOW_SECS: u64 = 7 * 24 * 3600;

/// Which priority tiers an arbiter honours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierPolicy {
    /// Critical > international > domestic, with starvation promotion.
    ThreeTier,
    /// International > domestic only; waiters are never promoted.
    TwoTier,
}

impl TierPolicy {
    pub fn promotes(self) -> bool {
        matches!(self, TierPolicy::ThreeTier)
    }
}

/// Bounds applied to every wait inside an arbiter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitTiming {
    /// Length of one timed wait slice; also the per-attempt budget before a retryable timeout.
    pub attempt_timeout: Duration,
    pub alert_threshold: Duration,
    pub crash_threshold: Duration,
}

impl Default for WaitTiming {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_millis(DEFAULT_ATTEMPT_TIMEOUT_MS),
            alert_threshold: Duration::from_secs(DEFAULT_ALERT_THRESHOLD_SECS),
            crash_threshold: Duration::from_secs(DEFAULT_CRASH_THRESHOLD_SECS),
        }
    }
}

/// A delay that is either constant or drawn uniformly from a closed range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelayPolicy {
    Fixed(Duration),
    Uniform { min: Duration, max: Duration },
}

impl DelayPolicy {
    pub fn sample(&self) -> Duration {
        match *self {
            DelayPolicy::Fixed(delay) => delay,
            DelayPolicy::Uniform { min, max } if min >= max => min,
            DelayPolicy::Uniform { min, max } => {
                let millis = rand::thread_rng().gen_range(min.as_millis()..=max.as_millis());
                Duration::from_millis(millis as u64)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub runways: u32,
    pub gates: u32,
    pub tower_slots: u32,
    pub tower_policy: TierPolicy,
    pub timing: WaitTiming,
    pub operation_base: Duration,
    pub backoff: DelayPolicy,
    pub arrival: DelayPolicy,
    pub simulation_window: Duration,
    pub max_flights: u32,
    pub international_ratio: f64,
    pub report_format: ReportFormat,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        let one_to_three = DelayPolicy::Uniform {
            min: Duration::from_millis(1000),
            max: Duration::from_millis(3000),
        };
        Self {
            runways: DEFAULT_RUNWAYS,
            gates: DEFAULT_GATES,
            tower_slots: DEFAULT_TOWER_SLOTS,
            tower_policy: TierPolicy::ThreeTier,
            timing: WaitTiming::default(),
            operation_base: Duration::from_millis(DEFAULT_OPERATION_BASE_MS),
            backoff: one_to_three,
            arrival: one_to_three,
            simulation_window: Duration::from_secs(DEFAULT_SIMULATION_SECS),
            max_flights: DEFAULT_MAX_FLIGHTS,
            international_ratio: DEFAULT_INTERNATIONAL_RATIO,
            report_format: ReportFormat::Text,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults for absent keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = Reader { lookup: &lookup };

        let runways = read.positive("RUNWAYS", DEFAULT_RUNWAYS)?;
        let gates = read.positive("GATES", DEFAULT_GATES)?;
        let tower_slots = read.positive("TOWER_SLOTS", DEFAULT_TOWER_SLOTS)?;

        let tower_policy = match read.parse("TOWER_TIERS", 3u8)? {
            3 => TierPolicy::ThreeTier,
            2 => TierPolicy::TwoTier,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "TOWER_TIERS",
                    value: other.to_string(),
                })
            }
        };

        let attempt_ms = read.positive("ATTEMPT_TIMEOUT_MS", DEFAULT_ATTEMPT_TIMEOUT_MS)?;
        read.at_most("ATTEMPT_TIMEOUT_MS", attempt_ms, MAX_DELAY_MS)?;
        let alert_secs = read.bounded("ALERT_THRESHOLD_SECS", DEFAULT_ALERT_THRESHOLD_SECS, MAX_WINDOW_SECS)?;
        let crash_secs = read.bounded("CRASH_THRESHOLD_SECS", DEFAULT_CRASH_THRESHOLD_SECS, MAX_WINDOW_SECS)?;
        if alert_secs >= crash_secs {
            return Err(ConfigError::ThresholdOrder { alert_secs, crash_secs });
        }

        let backoff = match read.raw("BACKOFF_MODE").as_deref().unwrap_or("random") {
            "fixed" => DelayPolicy::Fixed(Duration::from_millis(read.bounded("BACKOFF_MIN_MS", 1000, MAX_DELAY_MS)?)),
            "random" => read.range("BACKOFF_MIN_MS", "BACKOFF_MAX_MS", 1000, 3000)?,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "BACKOFF_MODE",
                    value: other.to_string(),
                })
            }
        };
        let arrival = read.range("ARRIVAL_MIN_MS", "ARRIVAL_MAX_MS", 1000, 3000)?;

        let international_ratio = read.parse("INTERNATIONAL_RATIO", DEFAULT_INTERNATIONAL_RATIO)?;
        if !(0.0..=1.0).contains(&international_ratio) {
            return Err(ConfigError::InvalidValue {
                key: "INTERNATIONAL_RATIO",
                value: international_ratio.to_string(),
            });
        }

        let report_format = match read.raw("REPORT_FORMAT").as_deref().unwrap_or("text") {
            "text" => ReportFormat::Text,
            "json" => ReportFormat::Json,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "REPORT_FORMAT",
                    value: other.to_string(),
                })
            }
        };
        let log_format = match read.raw("LOG_FORMAT").as_deref().unwrap_or("pretty") {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Config {
            runways,
            gates,
            tower_slots,
            tower_policy,
            timing: WaitTiming {
                attempt_timeout: Duration::from_millis(attempt_ms),
                alert_threshold: Duration::from_secs(alert_secs),
                crash_threshold: Duration::from_secs(crash_secs),
            },
            operation_base: Duration::from_millis(read.bounded("OPERATION_BASE_MS", DEFAULT_OPERATION_BASE_MS, MAX_DELAY_MS)?),
            backoff,
            arrival,
            simulation_window: Duration::from_secs(read.bounded("SIMULATION_SECS", DEFAULT_SIMULATION_SECS, MAX_WINDOW_SECS)?),
            max_flights: read.parse("MAX_FLIGHTS", DEFAULT_MAX_FLIGHTS)?,
            international_ratio,
            report_format,
            log_format,
        })
    }

    pub fn capacity(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Runway => self.runways,
            ResourceKind::Gate => self.gates,
            ResourceKind::Tower => self.tower_slots,
        }
    }

    pub fn tier_policy(&self, kind: ResourceKind) -> TierPolicy {
        match kind {
            ResourceKind::Tower => self.tower_policy,
            ResourceKind::Runway | ResourceKind::Gate => TierPolicy::ThreeTier,
        }
    }
}

struct Reader<'a, F> {
    lookup: &'a F,
}

impl<F> Reader<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.raw(key) {
            None => Ok(default),
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value }),
        }
    }

    fn positive<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + PartialEq + Default,
    {
        let value = self.parse(key, default)?;
        if value == T::default() {
            return Err(ConfigError::NotPositive { key });
        }
        Ok(value)
    }

    fn at_most(&self, key: &'static str, value: u64, max: u64) -> Result<(), ConfigError> {
        if value > max {
            return Err(ConfigError::OutOfRange { key, value, max });
        }
        Ok(())
    }

    fn bounded(&self, key: &'static str, default: u64, max: u64) -> Result<u64, ConfigError> {
        let value = self.parse(key, default)?;
        self.at_most(key, value, max)?;
        Ok(value)
    }

    fn range(
        &self,
        min_key: &'static str,
        max_key: &'static str,
        min_default: u64,
        max_default: u64,
    ) -> Result<DelayPolicy, ConfigError> {
        let min = self.bounded(min_key, min_default, MAX_DELAY_MS)?;
        let max = self.bounded(max_key, max_default, MAX_DELAY_MS)?;
        if min > max {
            return Err(ConfigError::InvertedRange { min_key, max_key, min, max });
        }
        Ok(DelayPolicy::Uniform {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        })
    }
}
