use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};

use crate::compensation::ThroughputSeries;
use crate::metrics::Policy;

/// Index of a cell in the scenario's cell set. Terminals refer to their
/// serving cell through this id, never through a handle.
pub type CellId = u32;

pub type TerminalId = u32;

/// Point in the 2-D service area (meters).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned square obstruction anchored at its lower corner.
/// Only used by renderers; signal computation ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstructionZone {
    pub x: i64,
    pub y: i64,
    pub size: i64,
}

impl ObstructionZone {
    pub fn overlaps(&self, other: &ObstructionZone) -> bool {
        self.x < other.x + other.size
            && self.x + self.size > other.x
            && self.y < other.y + other.size
            && self.y + self.size > other.y
    }
}

/// Base station. Immutable after the scenario is built.
#[derive(Debug, Clone, PartialEq, Component, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub position: Point,
    pub tx_power_dbm: f64,
    pub radius: f64,
    pub obstructions: Vec<ObstructionZone>,
}

/// Static per-terminal radio parameters.
#[derive(Debug, Clone, Copy, PartialEq, Component, Serialize, Deserialize)]
pub struct Terminal {
    pub id: TerminalId,
    /// Nominal bandwidth allocation (MHz).
    pub bandwidth: f64,
    /// When set, the canonical handover evaluation uses the dynamic bandwidth bonus.
    pub dynamic_allocation: bool,
    /// Thermal noise floor (dBm), derived from `bandwidth`.
    pub noise_dbm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Position(pub Point);

#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct MovementTarget(pub Point);

/// Serving relation and last link measurements of a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct ServingLink {
    pub cell: Option<CellId>,
    /// One-tick flag; cleared after the link views consumed it.
    pub handover_occurred: bool,
    /// Received power from the serving cell (dBm).
    pub signal_strength_dbm: f64,
    /// Throughput estimate of the selected candidate at the last evaluation.
    pub throughput: f64,
}

impl Default for ServingLink {
    fn default() -> Self {
        Self {
            cell: None,
            handover_occurred: false,
            signal_strength_dbm: -100.0,
            throughput: 0.0,
        }
    }
}

/// Throughput history for both policy views of one terminal.
#[derive(Debug, Clone, Default, Component)]
pub struct PolicySeries {
    pub dynamic: ThroughputSeries,
    pub regular: ThroughputSeries,
}

impl PolicySeries {
    pub fn get(&self, policy: Policy) -> &ThroughputSeries {
        match policy {
            Policy::Dynamic => &self.dynamic,
            Policy::Regular => &self.regular,
        }
    }

    pub fn get_mut(&mut self, policy: Policy) -> &mut ThroughputSeries {
        match policy {
            Policy::Dynamic => &mut self.dynamic,
            Policy::Regular => &mut self.regular,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_zones_do_not_overlap() {
        let a = ObstructionZone { x: 0, y: 0, size: 50 };
        let b = ObstructionZone { x: 50, y: 0, size: 50 };
        let c = ObstructionZone { x: 49, y: 49, size: 50 };
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }

    #[test]
    fn point_distance_is_euclidean() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_to(b), 5.0);
    }
}
