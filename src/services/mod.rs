pub mod arbiter;
pub mod lifecycle;
pub mod notification;
pub mod report;
pub mod statistics;
pub mod traffic;

use crate::config::Config;
use crate::error::ArbiterError;
use crate::models::resource::ResourceKind;
use std::sync::Arc;

use arbiter::{ArbiterSnapshot, ResourceArbiter};
use notification::EventSink;
use statistics::SharedStatistics;

/// Shared state every flight task works against.
pub struct Airport {
    pub config: Config,
    pub runways: ResourceArbiter,
    pub gates: ResourceArbiter,
    pub tower: ResourceArbiter,
    pub stats: Arc<SharedStatistics>,
    pub events: Arc<dyn EventSink>,
}

impl Airport {
    pub fn new(config: Config, events: Arc<dyn EventSink>) -> Result<Self, ArbiterError> {
        let stats = Arc::new(SharedStatistics::new());
        let build = |kind: ResourceKind| {
            ResourceArbiter::new(
                kind,
                config.capacity(kind),
                config.tier_policy(kind),
                config.timing,
                stats.clone(),
                events.clone(),
            )
        };
        let runways = build(ResourceKind::Runway)?;
        let gates = build(ResourceKind::Gate)?;
        let tower = build(ResourceKind::Tower)?;

        Ok(Self {
            config,
            runways,
            gates,
            tower,
            stats,
            events,
        })
    }

    pub fn arbiter(&self, kind: ResourceKind) -> &ResourceArbiter {
        match kind {
            ResourceKind::Runway => &self.runways,
            ResourceKind::Gate => &self.gates,
            ResourceKind::Tower => &self.tower,
        }
    }

    pub fn snapshots(&self) -> Vec<ArbiterSnapshot> {
        ResourceKind::ALL
            .iter()
            .map(|&kind| self.arbiter(kind).snapshot())
            .collect()
    }

    /// True when every pool is back at full capacity with nobody waiting.
    pub fn is_idle(&self) -> bool {
        self.snapshots().iter().all(|s| {
            s.available == s.capacity && s.waiting_critical == 0 && s.waiting_international == 0
        })
    }
}
