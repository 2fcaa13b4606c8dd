use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Point-in-time copy of the simulation counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub succeeded: u64,
    pub crashed: u64,
    pub starvation_alerts: u64,
    pub backoffs_taken: u64,
}

impl StatisticsSnapshot {
    pub fn terminated(&self) -> u64 {
        self.succeeded + self.crashed
    }
}

/// Counters shared by every flight and arbiter, guarded by their own lock.
#[derive(Debug, Default)]
pub struct SharedStatistics {
    inner: Mutex<StatisticsSnapshot>,
}

impl SharedStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.inner.lock().succeeded += 1;
    }

    pub fn record_crash(&self) {
        self.inner.lock().crashed += 1;
    }

    pub fn record_starvation_alert(&self) {
        self.inner.lock().starvation_alerts += 1;
    }

    pub fn record_backoff(&self) {
        self.inner.lock().backoffs_taken += 1;
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        *self.inner.lock()
    }
}
