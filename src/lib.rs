//! Airport resource contention simulator.
//!
//! Flights compete for runways, gates and tower slots through
//! [`services::arbiter::ResourceArbiter`], which admits requesters by tier
//! (critical, international, domestic), promotes starving waiters and forces
//! a release-and-retry backoff instead of waiting forever.

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::Airport;
