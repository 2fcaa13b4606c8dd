//! Capacity-limited resource pool with tiered admission.
//!
//! Every requester waits in bounded slices. When a slice expires the arbiter
//! decides between crashing the flight, promoting it to the critical tier,
//! or handing back a retryable timeout so the caller can release what it
//! holds and try again. Nothing here ever blocks indefinitely, which is what
//! keeps opposite acquisition orders across pools from deadlocking.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tokio::time::{self, Instant};

use crate::config::{TierPolicy, WaitTiming};
use crate::error::ArbiterError;
use crate::models::flight::{Category, Flight, FlightId};
use crate::models::resource::ResourceKind;
use crate::services::notification::{EventKind, EventSink, FlightEvent};
use crate::services::statistics::SharedStatistics;

/// Priority tier a requester waits in, highest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Critical,
    International,
    Domestic,
}

impl Tier {
    pub fn of(category: Category, is_critical: bool, policy: TierPolicy) -> Tier {
        match (policy, is_critical, category) {
            (TierPolicy::ThreeTier, true, _) => Tier::Critical,
            (_, _, Category::International) => Tier::International,
            (_, _, Category::Domestic) => Tier::Domestic,
        }
    }

    fn index(self) -> usize {
        match self {
            Tier::Critical => 0,
            Tier::International => 1,
            Tier::Domestic => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquireOutcome {
    Granted,
    TimedOutRetryable,
    Crashed,
}

/// The counters an arbiter protects with its lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArbiterState {
    pub available: u32,
    pub waiting_critical: u32,
    pub waiting_international: u32,
}

impl ArbiterState {
    pub fn new(capacity: u32) -> Self {
        Self {
            available: capacity,
            waiting_critical: 0,
            waiting_international: 0,
        }
    }

    /// Admission predicate: true while a requester in `tier` has to keep waiting.
    pub fn must_wait(&self, tier: Tier) -> bool {
        self.available == 0
            || match tier {
                Tier::Critical => false,
                Tier::International => self.waiting_critical > 0,
                Tier::Domestic => self.waiting_critical > 0 || self.waiting_international > 0,
            }
    }

    /// The single tier a release should wake.
    pub fn wake_tier(&self) -> Tier {
        if self.waiting_critical > 0 {
            Tier::Critical
        } else if self.waiting_international > 0 {
            Tier::International
        } else {
            Tier::Domestic
        }
    }

    pub fn enter_wait(&mut self, tier: Tier) {
        match tier {
            Tier::Critical => self.waiting_critical += 1,
            Tier::International => self.waiting_international += 1,
            Tier::Domestic => {}
        }
    }

    pub fn leave_wait(&mut self, tier: Tier) {
        match tier {
            Tier::Critical => self.waiting_critical -= 1,
            Tier::International => self.waiting_international -= 1,
            Tier::Domestic => {}
        }
    }
}

/// Read-only view of an arbiter for reports and assertions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbiterSnapshot {
    pub kind: ResourceKind,
    pub capacity: u32,
    pub available: u32,
    pub waiting_critical: u32,
    pub waiting_international: u32,
}

/// One flight's side of an acquire call.
///
/// `critical_for` is borrowed from the flight and names the pool a promotion
/// was earned on. Only that pool admits the flight in the critical tier, and
/// only its grant clears the promotion, so a backoff round trip through other
/// pools keeps the priority aimed at the resource the flight starved on.
#[derive(Debug)]
pub struct Requester<'a> {
    pub flight_id: FlightId,
    pub category: Category,
    pub critical_for: &'a mut Option<ResourceKind>,
    pub episode_start: Instant,
}

impl<'a> Requester<'a> {
    pub fn for_flight(flight: &'a mut Flight) -> Self {
        Self {
            flight_id: flight.id,
            category: flight.category,
            critical_for: &mut flight.critical_for,
            episode_start: flight.wait_episode_start,
        }
    }

    fn is_critical_on(&self, kind: ResourceKind) -> bool {
        *self.critical_for == Some(kind)
    }
}

pub struct ResourceArbiter {
    kind: ResourceKind,
    capacity: u32,
    policy: TierPolicy,
    timing: WaitTiming,
    state: Mutex<ArbiterState>,
    signals: [Notify; 3],
    stats: Arc<SharedStatistics>,
    events: Arc<dyn EventSink>,
}

impl ResourceArbiter {
    pub fn new(
        kind: ResourceKind,
        capacity: u32,
        policy: TierPolicy,
        timing: WaitTiming,
        stats: Arc<SharedStatistics>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, ArbiterError> {
        if capacity == 0 {
            return Err(ArbiterError::ZeroCapacity { kind });
        }
        Ok(Self {
            kind,
            capacity,
            policy,
            timing,
            state: Mutex::new(ArbiterState::new(capacity)),
            signals: [Notify::new(), Notify::new(), Notify::new()],
            stats,
            events,
        })
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn policy(&self) -> TierPolicy {
        self.policy
    }

    pub fn snapshot(&self) -> ArbiterSnapshot {
        let state = *self.state.lock();
        ArbiterSnapshot {
            kind: self.kind,
            capacity: self.capacity,
            available: state.available,
            waiting_critical: state.waiting_critical,
            waiting_international: state.waiting_international,
        }
    }

    /// Waits for one unit of this pool.
    ///
    /// Returns `Granted` once admitted, `Crashed` once the episode has lasted
    /// past the crash threshold, and `TimedOutRetryable` when a wait slice
    /// expires without reaching either threshold.
    pub async fn acquire(&self, req: &mut Requester<'_>) -> AcquireOutcome {
        self.publish(req, EventKind::AcquireAttempt(self.kind), format!("requesting {}", self.kind));
        let mut slice_deadline = Instant::now() + self.timing.attempt_timeout;

        loop {
            let (tier, notified) = {
                let mut state = self.state.lock();
                let was_critical = req.is_critical_on(self.kind);
                let tier = Tier::of(req.category, was_critical, self.policy);
                if !state.must_wait(tier) {
                    state.available -= 1;
                    if was_critical {
                        *req.critical_for = None;
                    }
                    drop(state);
                    tracing::trace!(flight = req.flight_id, resource = %self.kind, was_critical, "unit granted");
                    self.publish(req, EventKind::Granted(self.kind), format!("{} granted", self.kind));
                    return AcquireOutcome::Granted;
                }
                state.enter_wait(tier);
                // Registered before the lock drops so a release in between cannot be missed.
                let mut notified: Pin<Box<Notified<'_>>> = Box::pin(self.signals[tier.index()].notified());
                notified.as_mut().enable();
                (tier, notified)
            };

            let woken = time::timeout_at(slice_deadline, notified).await.is_ok();

            let mut state = self.state.lock();
            state.leave_wait(tier);
            if woken {
                continue;
            }

            let elapsed = req.episode_start.elapsed();
            if elapsed >= self.timing.crash_threshold {
                drop(state);
                self.stats.record_crash();
                self.publish(
                    req,
                    EventKind::Crashed(self.kind),
                    format!("CRASHED after waiting {:.1}s for {}", elapsed.as_secs_f64(), self.kind),
                );
                return AcquireOutcome::Crashed;
            }

            if self.policy.promotes() && elapsed >= self.timing.alert_threshold && req.critical_for.is_none() {
                *req.critical_for = Some(self.kind);
                drop(state);
                self.stats.record_starvation_alert();
                self.publish(
                    req,
                    EventKind::Promoted(self.kind),
                    format!("MAYDAY! starving for {}, promoted to critical", self.kind),
                );
                slice_deadline = Instant::now() + self.timing.attempt_timeout;
                continue;
            }

            tracing::debug!(
                flight = req.flight_id,
                resource = %self.kind,
                waited_ms = elapsed.as_millis() as u64,
                "wait slice expired"
            );
            return AcquireOutcome::TimedOutRetryable;
        }
    }

    /// Returns one unit and wakes the highest tier that has waiters.
    pub fn release(&self, flight_id: FlightId) -> Result<(), ArbiterError> {
        let mut state = self.state.lock();
        if state.available >= self.capacity {
            return Err(ArbiterError::OverRelease {
                kind: self.kind,
                flight: flight_id,
                capacity: self.capacity,
            });
        }
        state.available += 1;
        let tier = state.wake_tier();
        self.signals[tier.index()].notify_waiters();
        tracing::trace!(flight = flight_id, resource = %self.kind, woke = ?tier, "unit released");
        Ok(())
    }

    fn publish(&self, req: &Requester<'_>, kind: EventKind, message: String) {
        self.events
            .publish(FlightEvent::new(req.flight_id, req.category, kind, message));
    }
}

impl std::fmt::Debug for ResourceArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceArbiter")
            .field("kind", &self.kind)
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("state", &*self.state.lock())
            .finish()
    }
}
