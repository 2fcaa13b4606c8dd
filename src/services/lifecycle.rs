use std::sync::Arc;
use std::time::Duration;

use crate::error::FlightError;
use crate::models::flight::{Category, Flight, Phase};
use crate::models::resource::ResourceKind;
use crate::services::arbiter::{AcquireOutcome, Requester};
use crate::services::notification::{EventKind, FlightEvent};
use crate::services::Airport;

use ResourceKind::{Gate, Runway, Tower};

/// Ordered resources a flight must hold together to complete one phase.
///
/// Domestic and international flights take shared pools in opposite orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhasePlan {
    pub phase: Phase,
    pub resources: &'static [ResourceKind],
}

impl PhasePlan {
    pub fn for_flight(phase: Phase, category: Category) -> Option<PhasePlan> {
        let resources: &'static [ResourceKind] = match (phase, category) {
            (Phase::Landing, Category::International) => &[Runway, Tower],
            (Phase::Landing, Category::Domestic) => &[Tower, Runway],
            (Phase::Deboarding, Category::International) => &[Gate, Tower],
            (Phase::Deboarding, Category::Domestic) => &[Tower, Gate],
            (Phase::Takeoff, Category::International) => &[Gate, Runway, Tower],
            (Phase::Takeoff, Category::Domestic) => &[Tower, Gate, Runway],
            _ => return None,
        };
        Some(PhasePlan { phase, resources })
    }

    /// Simulated operation time while every resource in the plan is held.
    pub fn hold_duration(&self, base: Duration) -> Duration {
        let permille: u32 = self.resources.iter().map(|r| r.hold_permille()).sum();
        base * permille / 1000
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PhaseOutcome {
    Completed,
    Crashed,
}

/// Drives one flight from `Scheduled` to `Done` or `Crashed`.
#[derive(Clone)]
pub struct FlightLifecycle {
    airport: Arc<Airport>,
}

impl FlightLifecycle {
    pub fn new(airport: Arc<Airport>) -> Self {
        Self { airport }
    }

    pub async fn run(&self, mut flight: Flight) -> Result<Flight, FlightError> {
        for phase in [Phase::Landing, Phase::Deboarding, Phase::Takeoff] {
            self.enter(&mut flight, phase)?;
            if self.run_phase(&mut flight, phase).await? == PhaseOutcome::Crashed {
                flight.transition(Phase::Crashed)?;
                return Ok(flight);
            }
            if phase == Phase::Deboarding {
                self.enter(&mut flight, Phase::AwaitingDeparture)?;
            }
        }

        flight.transition(Phase::Done)?;
        self.airport.stats.record_success();
        self.notify(&flight, EventKind::Completed, "takeoff complete, all resources released".to_string());
        Ok(flight)
    }

    async fn run_phase(&self, flight: &mut Flight, phase: Phase) -> Result<PhaseOutcome, FlightError> {
        let Some(plan) = PhasePlan::for_flight(phase, flight.category) else {
            return Ok(PhaseOutcome::Completed);
        };
        let mut held: Vec<ResourceKind> = Vec::with_capacity(plan.resources.len());
        flight.begin_wait_episode();

        'attempt: loop {
            for &kind in plan.resources {
                let outcome = {
                    let mut requester = Requester::for_flight(flight);
                    self.airport.arbiter(kind).acquire(&mut requester).await
                };
                match outcome {
                    AcquireOutcome::Granted => held.push(kind),
                    AcquireOutcome::Crashed => {
                        self.release_held(flight, &mut held)?;
                        return Ok(PhaseOutcome::Crashed);
                    }
                    AcquireOutcome::TimedOutRetryable => {
                        let returned = held.clone();
                        self.release_held(flight, &mut held)?;
                        self.airport.stats.record_backoff();
                        let delay = self.airport.config.backoff.sample();
                        self.notify(
                            flight,
                            EventKind::Backoff(kind),
                            format!(
                                "timed out waiting for {kind}, returning {returned:?} and retrying {phase} in {}ms",
                                delay.as_millis()
                            ),
                        );
                        tokio::time::sleep(delay).await;
                        continue 'attempt;
                    }
                }
            }
            break;
        }

        tokio::time::sleep(plan.hold_duration(self.airport.config.operation_base)).await;
        self.release_held(flight, &mut held)?;
        self.notify(flight, EventKind::PhaseChanged(phase), format!("{phase} complete, resources released"));
        Ok(PhaseOutcome::Completed)
    }

    fn enter(&self, flight: &mut Flight, phase: Phase) -> Result<(), FlightError> {
        flight.transition(phase)?;
        self.notify(flight, EventKind::PhaseChanged(phase), format!("entering {phase}"));
        Ok(())
    }

    /// Releases in reverse acquisition order.
    fn release_held(&self, flight: &Flight, held: &mut Vec<ResourceKind>) -> Result<(), FlightError> {
        while let Some(kind) = held.pop() {
            self.airport.arbiter(kind).release(flight.id)?;
        }
        Ok(())
    }

    fn notify(&self, flight: &Flight, kind: EventKind, message: String) {
        self.airport
            .events
            .publish(FlightEvent::new(flight.id, flight.category, kind, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_orders_on_shared_pools() {
        for phase in [Phase::Landing, Phase::Deboarding, Phase::Takeoff] {
            let intl = PhasePlan::for_flight(phase, Category::International).unwrap();
            let dom = PhasePlan::for_flight(phase, Category::Domestic).unwrap();
            assert_eq!(intl.resources.len(), dom.resources.len());
            assert_ne!(intl.resources, dom.resources, "{phase} must order pools differently per category");
            assert_eq!(dom.resources[0], ResourceKind::Tower, "domestic flights start at the tower");
        }
    }

    #[test]
    fn test_no_plan_outside_resource_phases() {
        for phase in [Phase::Scheduled, Phase::AwaitingDeparture, Phase::Done, Phase::Crashed] {
            assert!(PhasePlan::for_flight(phase, Category::Domestic).is_none());
        }
    }

    #[test]
    fn test_hold_duration_weights() {
        let base = Duration::from_millis(2000);
        let landing = PhasePlan::for_flight(Phase::Landing, Category::Domestic).unwrap();
        let deboarding = PhasePlan::for_flight(Phase::Deboarding, Category::International).unwrap();
        let takeoff = PhasePlan::for_flight(Phase::Takeoff, Category::Domestic).unwrap();
        assert_eq!(landing.hold_duration(base), Duration::from_millis(1200));
        assert_eq!(deboarding.hold_duration(base), Duration::from_millis(2200));
        assert_eq!(takeoff.hold_duration(base), Duration::from_millis(3200));
    }
}
