use thiserror::Error;

use crate::models::flight::{FlightId, Phase};
use crate::models::resource::ResourceKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    NotPositive { key: &'static str },

    #[error("{key} = {value} exceeds the maximum of {max}")]
    OutOfRange { key: &'static str, value: u64, max: u64 },

    #[error("alert threshold ({alert_secs}s) must be below crash threshold ({crash_secs}s)")]
    ThresholdOrder { alert_secs: u64, crash_secs: u64 },

    #[error("{min_key} ({min}) must not exceed {max_key} ({max})")]
    InvertedRange {
        min_key: &'static str,
        max_key: &'static str,
        min: u64,
        max: u64,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArbiterError {
    #[error("{kind} pool needs a capacity of at least one")]
    ZeroCapacity { kind: ResourceKind },

    #[error("flight {flight} released a {kind} unit it does not hold (pool already at capacity {capacity})")]
    OverRelease {
        kind: ResourceKind,
        flight: FlightId,
        capacity: u32,
    },
}

#[derive(Debug, Error)]
pub enum FlightError {
    #[error("flight {flight} cannot move from {from} to {to}")]
    IllegalTransition {
        flight: FlightId,
        from: Phase,
        to: Phase,
    },

    #[error(transparent)]
    Arbiter(#[from] ArbiterError),
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("flight task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Flight(#[from] FlightError),

    #[error("flight id {id} already used, next free id is {next}")]
    StaleFlightId { id: FlightId, next: FlightId },

    #[error("statistics requested while {0} flights are still running")]
    FlightsInProgress(usize),
}
