//! Telemetry: per-tick snapshots returned to the caller and the handover log.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::ecs::{CellId, Point, TerminalId};
use crate::handover::HandoverEvent;
use crate::metrics::{Policy, PolicyMetrics};

/// State and KPIs of one terminal after a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalTick {
    pub terminal_id: TerminalId,
    pub position: Point,
    pub serving_cell: Option<CellId>,
    pub handover_occurred: bool,
    pub dynamic: Option<PolicyMetrics>,
    pub regular: Option<PolicyMetrics>,
}

impl TerminalTick {
    pub fn metrics(&self, policy: Policy) -> Option<&PolicyMetrics> {
        match policy {
            Policy::Dynamic => self.dynamic.as_ref(),
            Policy::Regular => self.regular.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TickResult {
    pub tick: u64,
    /// Ordered by terminal id.
    pub terminals: Vec<TerminalTick>,
}

impl TickResult {
    pub fn terminal(&self, id: TerminalId) -> Option<&TerminalTick> {
        self.terminals.iter().find(|t| t.terminal_id == id)
    }

    pub fn handovers(&self) -> usize {
        self.terminals.iter().filter(|t| t.handover_occurred).count()
    }
}

/// Terminal snapshots collected while the schedule runs; drained into a
/// [`TickResult`] by the runner.
#[derive(Debug, Default, Resource)]
pub struct TickReports {
    pub terminals: Vec<TerminalTick>,
}

/// Every serving-cell change of the run, in order.
#[derive(Debug, Default, Clone, Resource)]
pub struct HandoverLog {
    pub events: Vec<HandoverEvent>,
}

impl HandoverLog {
    pub fn push(&mut self, event: HandoverEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
