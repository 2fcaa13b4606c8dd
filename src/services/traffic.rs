use rand::Rng;
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinSet};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{FlightError, SimulationError};
use crate::models::flight::{Category, Flight, FlightId};
use crate::services::lifecycle::FlightLifecycle;
use crate::services::statistics::StatisticsSnapshot;
use crate::services::Airport;

/// Spawns flight tasks and collects their terminal states.
pub struct TrafficControl {
    airport: Arc<Airport>,
    lifecycle: FlightLifecycle,
    flights: JoinSet<Result<Flight, FlightError>>,
    next_id: FlightId,
}

impl TrafficControl {
    pub fn new(airport: Arc<Airport>) -> Self {
        Self {
            lifecycle: FlightLifecycle::new(airport.clone()),
            airport,
            flights: JoinSet::new(),
            next_id: 1,
        }
    }

    pub fn airport(&self) -> &Arc<Airport> {
        &self.airport
    }

    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }

    /// Starts a lifecycle task for a new flight. Ids must increase across calls.
    pub fn spawn_flight(&mut self, id: FlightId, category: Category) -> Result<AbortHandle, SimulationError> {
        if id < self.next_id {
            return Err(SimulationError::StaleFlightId { id, next: self.next_id });
        }
        Ok(self.launch(id, category))
    }

    /// Spawns the next arrival with a category drawn from the configured ratio.
    pub fn spawn_arrival(&mut self) -> FlightId {
        let id = self.next_id;
        let category = if rand::thread_rng().gen_bool(self.airport.config.international_ratio) {
            Category::International
        } else {
            Category::Domestic
        };
        self.launch(id, category);
        id
    }

    fn launch(&mut self, id: FlightId, category: Category) -> AbortHandle {
        self.next_id = id.saturating_add(1);
        let lifecycle = self.lifecycle.clone();
        tracing::info!(flight = id, category = %category, "flight scheduled");
        self.flights
            .spawn(async move { lifecycle.run(Flight::new(id, category)).await })
    }

    /// Generates arrivals until the simulation window closes, the flight cap
    /// is reached, or `shutdown` fires. Returns how many flights were spawned.
    pub async fn run_arrivals(&mut self, shutdown: &CancellationToken) -> u32 {
        let window_end = Instant::now() + self.airport.config.simulation_window;
        let mut spawned = 0;

        while spawned < self.airport.config.max_flights
            && Instant::now() < window_end
            && !shutdown.is_cancelled()
        {
            self.spawn_arrival();
            spawned += 1;

            let next_arrival = (Instant::now() + self.airport.config.arrival.sample()).min(window_end);
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(spawned, "shutdown requested, closing arrivals");
                    break;
                }
                _ = time::sleep_until(next_arrival) => {}
            }
        }

        tracing::info!(spawned, in_flight = self.flights.len(), "arrival window closed");
        spawned
    }

    /// Blocks until every spawned flight reaches `Done` or `Crashed`.
    ///
    /// The whole set is drained even when a task fails; the first failure is
    /// returned afterwards.
    pub async fn await_all_flights(&mut self) -> Result<Vec<Flight>, SimulationError> {
        let mut finished = Vec::with_capacity(self.flights.len());
        let mut first_error: Option<SimulationError> = None;
        while let Some(joined) = self.flights.join_next().await {
            let outcome = joined
                .map_err(SimulationError::from)
                .and_then(|result| result.map_err(SimulationError::from));
            match outcome {
                Ok(flight) => finished.push(flight),
                Err(err) => {
                    tracing::error!(error = %err, "flight task failed");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }
        finished.sort_by_key(|f| f.id);
        Ok(finished)
    }

    /// Final counters; only meaningful once no flight is running.
    pub fn read_statistics(&self) -> Result<StatisticsSnapshot, SimulationError> {
        if !self.flights.is_empty() {
            return Err(SimulationError::FlightsInProgress(self.flights.len()));
        }
        Ok(self.airport.stats.snapshot())
    }
}
