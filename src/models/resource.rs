use serde::{Deserialize, Serialize};
use std::fmt;

/// A physical resource pool at the airport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Runway,
    Gate,
    Tower,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Runway, ResourceKind::Gate, ResourceKind::Tower];

    /// Share of the base operation time a held unit of this kind contributes, in thousandths.
    pub fn hold_permille(self) -> u32 {
        match self {
            ResourceKind::Runway => 500,
            ResourceKind::Gate => 1000,
            ResourceKind::Tower => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Runway => "runway",
            ResourceKind::Gate => "gate",
            ResourceKind::Tower => "tower",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
