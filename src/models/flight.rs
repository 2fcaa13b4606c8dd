use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

use crate::error::FlightError;
use crate::models::resource::ResourceKind;

pub type FlightId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Domestic,
    International,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Domestic => f.write_str("domestic"),
            Category::International => f.write_str("international"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Scheduled,
    Landing,
    Deboarding,
    AwaitingDeparture,
    Takeoff,
    Done,
    Crashed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Crashed)
    }

    /// Phases in which the flight competes for resources.
    pub fn acquires_resources(self) -> bool {
        matches!(self, Phase::Landing | Phase::Deboarding | Phase::Takeoff)
    }

    pub fn can_transition_to(self, next: Phase) -> bool {
        match (self, next) {
            (Phase::Scheduled, Phase::Landing)
            | (Phase::Landing, Phase::Deboarding)
            | (Phase::Deboarding, Phase::AwaitingDeparture)
            | (Phase::AwaitingDeparture, Phase::Takeoff)
            | (Phase::Takeoff, Phase::Done) => true,
            (from, Phase::Crashed) => from.acquires_resources(),
            _ => false,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Scheduled => "scheduled",
            Phase::Landing => "landing",
            Phase::Deboarding => "deboarding",
            Phase::AwaitingDeparture => "awaiting departure",
            Phase::Takeoff => "takeoff",
            Phase::Done => "done",
            Phase::Crashed => "crashed",
        };
        f.write_str(label)
    }
}

/// One simulated aircraft. Owned and mutated only by its own lifecycle task.
#[derive(Clone, Debug)]
pub struct Flight {
    pub id: FlightId,
    pub category: Category,
    pub phase: Phase,
    /// Pool this flight was promoted on while starving, cleared when that pool grants.
    pub critical_for: Option<ResourceKind>,
    pub wait_episode_start: Instant,
}

impl Flight {
    pub fn new(id: FlightId, category: Category) -> Self {
        Self {
            id,
            category,
            phase: Phase::Scheduled,
            critical_for: None,
            wait_episode_start: Instant::now(),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.critical_for.is_some()
    }

    pub fn transition(&mut self, next: Phase) -> Result<(), FlightError> {
        if !self.phase.can_transition_to(next) {
            return Err(FlightError::IllegalTransition {
                flight: self.id,
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    pub fn begin_wait_episode(&mut self) {
        self.wait_episode_start = Instant::now();
    }
}
