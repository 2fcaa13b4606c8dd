use serde::Serialize;
use std::fmt;

use crate::models::flight::{Category, Flight, FlightId, Phase};
use crate::models::resource::ResourceKind;
use crate::services::arbiter::ArbiterSnapshot;
use crate::services::statistics::StatisticsSnapshot;

#[derive(Clone, Debug, Serialize)]
pub struct FlightSummary {
    pub id: FlightId,
    pub category: Category,
    pub final_phase: Phase,
}

/// End-of-run summary.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub statistics: StatisticsSnapshot,
    pub arbiters: Vec<ArbiterSnapshot>,
    pub flights: Vec<FlightSummary>,
}

impl Report {
    pub fn new(statistics: StatisticsSnapshot, arbiters: Vec<ArbiterSnapshot>, flights: &[Flight]) -> Self {
        let flights = flights
            .iter()
            .map(|f| FlightSummary {
                id: f.id,
                category: f.category,
                final_phase: f.phase,
            })
            .collect();
        Self {
            statistics,
            arbiters,
            flights,
        }
    }

    /// Pools that did not return to full capacity.
    pub fn leaked(&self) -> Vec<ResourceKind> {
        self.arbiters
            .iter()
            .filter(|a| a.available != a.capacity)
            .map(|a| a.kind)
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(54);
        writeln!(f, "{rule}")?;
        writeln!(f, "{:^54}", "FINAL SIMULATION REPORT")?;
        writeln!(f, "{rule}")?;

        writeln!(f, "\n--- OVERALL ---")?;
        writeln!(f, "Flights completed:            {}", self.statistics.succeeded)?;
        writeln!(f, "Flights crashed (starvation): {}", self.statistics.crashed)?;
        writeln!(f, "Starvation alerts (MAYDAY):   {}", self.statistics.starvation_alerts)?;
        writeln!(f, "Deadlocks avoided (backoffs): {}", self.statistics.backoffs_taken)?;
        for a in &self.arbiters {
            writeln!(f, "{:<8} available:          {}/{}", a.kind.as_str(), a.available, a.capacity)?;
        }

        writeln!(f, "\n--- FINAL STATE PER FLIGHT ---")?;
        for flight in &self.flights {
            writeln!(
                f,
                "Flight {:03} ({:<13}) - {}",
                flight.id,
                flight.category.to_string(),
                flight.final_phase
            )?;
        }
        write!(f, "\n{rule}")
    }
}
