use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

/// Which policy views a tick should evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Resource)]
pub enum ModePolicy {
    Dynamic,
    Regular,
    #[default]
    Both,
}

impl ModePolicy {
    pub fn includes_dynamic(self) -> bool {
        matches!(self, ModePolicy::Dynamic | ModePolicy::Both)
    }

    pub fn includes_regular(self) -> bool {
        matches!(self, ModePolicy::Regular | ModePolicy::Both)
    }
}

/// Authoritative simulation clock. Tick 0 is the state right after reset;
/// the first processed tick is 1.
#[derive(Debug, Default, Clone, Copy, Resource)]
pub struct SimulationClock {
    now: u64,
}

impl SimulationClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Advances to the next tick and returns it.
    pub fn advance(&mut self) -> u64 {
        self.now += 1;
        self.now
    }
}

/// Number of ticks a full run lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Resource)]
pub struct RunLength(pub u64);

impl Default for RunLength {
    fn default() -> Self {
        Self(200)
    }
}
