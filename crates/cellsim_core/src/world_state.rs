//! `WorldState`: the entry point that owns one simulated network.
//!
//! It wraps the ECS world and the tick schedule behind the operations a
//! caller needs: reset, tick, run, inspection and the external actions of a
//! learning agent (forced handover, observation).

use bevy_ecs::prelude::{Entity, Schedule, World};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{ModePolicy, RunLength, SimulationClock};
use crate::compensation::ThroughputSeries;
use crate::ecs::{
    Cell, MovementTarget, Point, PolicySeries, Position, ServingLink, Terminal, TerminalId,
};
use crate::error::ConfigError;
use crate::handover::{force_strongest, HandoverDecision, HandoverEvent};
use crate::metrics::{ComparisonReport, Policy, PolicyAggregates};
use crate::mobility::clamp_to_area;
use crate::propagation;
use crate::runner::{run_tick, run_ticks_with_hook, simulation_schedule};
use crate::scenario::{build_scenario, MobilityConfig, ScenarioParams};
use crate::sink::{RecordSink, RecordSinkResource};
use crate::telemetry::{HandoverLog, TickResult};

/// Read-only copy of a terminal's state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminalSnapshot {
    pub id: TerminalId,
    pub position: Point,
    pub target: Point,
    pub serving_cell: Option<u32>,
    pub signal_strength_dbm: f64,
    pub throughput: f64,
    pub bandwidth: f64,
    pub dynamic_allocation: bool,
}

/// Observation handed to a learning agent:
/// `[serving signal strength (dBm), x, y, target_x, target_y]`.
/// The signal strength is negative infinity while the terminal is unserved.
pub type Observation = [f64; 5];

pub struct WorldState {
    world: World,
    schedule: Schedule,
    params: ScenarioParams,
    cells: Vec<Entity>,
    /// Indexed by terminal id.
    terminals: Vec<Entity>,
}

impl WorldState {
    /// Builds a fresh world from `params`. The same seed and params always
    /// produce the same cells, zones and terminals.
    pub fn reset(params: ScenarioParams) -> Result<Self, ConfigError> {
        let mut world = World::new();
        build_scenario(&mut world, &params)?;

        let mut cells: Vec<(u32, Entity)> = world
            .query::<(Entity, &Cell)>()
            .iter(&world)
            .map(|(entity, cell)| (cell.id, entity))
            .collect();
        cells.sort_by_key(|(id, _)| *id);
        let mut terminals: Vec<(TerminalId, Entity)> = world
            .query::<(Entity, &Terminal)>()
            .iter(&world)
            .map(|(entity, terminal)| (terminal.id, entity))
            .collect();
        terminals.sort_by_key(|(id, _)| *id);

        Ok(Self {
            world,
            schedule: simulation_schedule(),
            params,
            cells: cells.into_iter().map(|(_, e)| e).collect(),
            terminals: terminals.into_iter().map(|(_, e)| e).collect(),
        })
    }

    /// Routes every emitted record to `sink`.
    pub fn with_sink(mut self, sink: impl RecordSink + 'static) -> Self {
        self.set_sink(sink);
        self
    }

    pub fn set_sink(&mut self, sink: impl RecordSink + 'static) {
        self.flush_sink();
        self.world.insert_resource(RecordSinkResource::new(sink));
    }

    /// Flushes the current sink; failures are logged.
    pub fn flush_sink(&mut self) {
        if let Some(mut sink) = self.world.get_resource_mut::<RecordSinkResource>() {
            if let Err(err) = sink.0.flush() {
                tracing::warn!(error = %err, "record sink flush failed");
            }
        }
    }

    pub fn params(&self) -> &ScenarioParams {
        &self.params
    }

    pub fn now(&self) -> u64 {
        self.world.resource::<SimulationClock>().now()
    }

    pub fn run_length(&self) -> u64 {
        self.world.resource::<RunLength>().0
    }

    pub fn tick(&mut self, policy: ModePolicy) -> TickResult {
        run_tick(&mut self.world, &mut self.schedule, policy)
    }

    /// Runs the configured run length and returns every tick's snapshot.
    pub fn run(&mut self, policy: ModePolicy) -> Vec<TickResult> {
        self.run_with_hook(policy, |_| {})
    }

    pub fn run_with_hook<F>(&mut self, policy: ModePolicy, mut hook: F) -> Vec<TickResult>
    where
        F: FnMut(&TickResult),
    {
        let ticks = self.run_length();
        let results =
            run_ticks_with_hook(&mut self.world, &mut self.schedule, policy, ticks, |_, r| {
                hook(r)
            });
        self.flush_sink();
        results
    }

    /// Dynamic-versus-regular comparison over the ticks processed so far.
    pub fn report(&self) -> ComparisonReport {
        self.world.resource::<PolicyAggregates>().report(self.now())
    }

    fn terminal_entity(&self, id: TerminalId) -> Option<Entity> {
        self.terminals.get(id as usize).copied()
    }

    fn cell_refs(&self) -> Vec<&Cell> {
        self.cells
            .iter()
            .filter_map(|e| self.world.get::<Cell>(*e))
            .collect()
    }

    /// Switches `terminal` to the cell with the strongest received power,
    /// bypassing the eligibility gate. Returns `None` for an unknown id.
    ///
    /// The handover flag is consumed by the next tick, so the event is logged
    /// under that tick.
    pub fn force_handover(&mut self, terminal: TerminalId) -> Option<HandoverDecision> {
        let entity = self.terminal_entity(terminal)?;
        let position = self.world.get::<Position>(entity)?.0;
        let cells: Vec<Cell> = self.cell_refs().into_iter().cloned().collect();
        let refs: Vec<&Cell> = cells.iter().collect();

        let tick = self.now() + 1;
        let mut link = self.world.get_mut::<ServingLink>(entity)?;
        let decision = force_strongest(&mut link, &refs, position);
        if let HandoverDecision::Handover { from, to } = decision {
            debug!(terminal, from, to, tick, "forced handover");
            self.world.resource_mut::<HandoverLog>().push(HandoverEvent {
                terminal,
                from: Some(from),
                to,
                tick,
                forced: true,
            });
        }
        Some(decision)
    }

    pub fn observe(&self, terminal: TerminalId) -> Option<Observation> {
        let entity = self.terminal_entity(terminal)?;
        let position = self.world.get::<Position>(entity)?.0;
        let target = self.world.get::<MovementTarget>(entity)?.0;
        let link = self.world.get::<ServingLink>(entity)?;
        let strength = link
            .cell
            .and_then(|id| self.cell(id))
            .map_or(f64::NEG_INFINITY, |cell| {
                propagation::signal_strength(cell, position)
            });
        Some([strength, position.x, position.y, target.x, target.y])
    }

    /// Moves `terminal` to `(x, y)` and parks it there: position and target
    /// are both set, clamped to the service area.
    pub fn relocate_terminal(&mut self, terminal: TerminalId, x: f64, y: f64) -> bool {
        let Some(entity) = self.terminal_entity(terminal) else {
            return false;
        };
        let area_max = self.world.resource::<MobilityConfig>().area_max;
        let point = clamp_to_area(Point::new(x, y), area_max);
        let mut entity = self.world.entity_mut(entity);
        if let Some(mut position) = entity.get_mut::<Position>() {
            position.0 = point;
        }
        if let Some(mut target) = entity.get_mut::<MovementTarget>() {
            target.0 = point;
        }
        true
    }

    pub fn cell(&self, id: u32) -> Option<&Cell> {
        self.cells
            .get(id as usize)
            .and_then(|e| self.world.get::<Cell>(*e))
    }

    /// Cells ordered by id.
    pub fn cells(&self) -> Vec<&Cell> {
        self.cell_refs()
    }

    /// Terminals ordered by id.
    pub fn terminals(&self) -> Vec<TerminalSnapshot> {
        (0..self.terminals.len() as TerminalId)
            .filter_map(|id| self.terminal(id))
            .collect()
    }

    pub fn terminal(&self, id: TerminalId) -> Option<TerminalSnapshot> {
        let entity = self.world.get_entity(self.terminal_entity(id)?)?;
        let terminal = entity.get::<Terminal>()?;
        let link = entity.get::<ServingLink>()?;
        Some(TerminalSnapshot {
            id: terminal.id,
            position: entity.get::<Position>()?.0,
            target: entity.get::<MovementTarget>()?.0,
            serving_cell: link.cell,
            signal_strength_dbm: link.signal_strength_dbm,
            throughput: link.throughput,
            bandwidth: terminal.bandwidth,
            dynamic_allocation: terminal.dynamic_allocation,
        })
    }

    pub fn series(&self, terminal: TerminalId, policy: Policy) -> Option<&ThroughputSeries> {
        let entity = self.terminal_entity(terminal)?;
        self.world
            .get::<PolicySeries>(entity)
            .map(|series| series.get(policy))
    }

    pub fn handover_log(&self) -> &[HandoverEvent] {
        &self.world.resource::<HandoverLog>().events
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::TerminalSpec;
    use crate::sink::MemorySink;

    fn two_cells(at: Point) -> ScenarioParams {
        ScenarioParams::default()
            .with_seed(11)
            .with_fixed_cells([Point::new(0.0, 0.0), Point::new(2000.0, 0.0)])
            .with_fixed_terminals(vec![TerminalSpec {
                position: at,
                target: at,
            }])
            .with_retarget_probability(0.0)
            .without_fading()
    }

    #[test]
    fn unknown_terminals_are_reported_as_missing() {
        let mut state = WorldState::reset(two_cells(Point::new(500.0, 0.0))).expect("reset");
        assert!(state.observe(7).is_none());
        assert!(state.force_handover(7).is_none());
        assert!(!state.relocate_terminal(7, 1.0, 1.0));
        assert!(state.series(7, Policy::Dynamic).is_none());
    }

    #[test]
    fn observation_reports_serving_strength_once_assigned() {
        let mut state = WorldState::reset(two_cells(Point::new(500.0, 0.0))).expect("reset");
        let before = state.observe(0).expect("observation");
        assert_eq!(before[0], f64::NEG_INFINITY);
        assert_eq!(&before[1..], &[500.0, 0.0, 500.0, 0.0]);

        state.tick(ModePolicy::Both);
        let after = state.observe(0).expect("observation");
        let expected = propagation::signal_strength(
            state.cell(0).expect("cell"),
            Point::new(500.0, 0.0),
        );
        assert!((after[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn forced_handover_is_logged_and_consumed_next_tick() {
        let mut state = WorldState::reset(two_cells(Point::new(500.0, 0.0))).expect("reset");
        state.tick(ModePolicy::Both);
        state.relocate_terminal(0, 1900.0, 0.0);
        let decision = state.force_handover(0).expect("terminal");
        assert!(decision.is_handover());
        assert_eq!(decision, HandoverDecision::Handover { from: 0, to: 1 });
        let log = state.handover_log();
        assert_eq!(log.len(), 1);
        assert!(log[0].forced);
        assert_eq!(log[0].tick, 2);

        let result = state.tick(ModePolicy::Both);
        assert_eq!(result.tick, 2);
        assert!(result.terminals[0].handover_occurred);
        assert_eq!(result.terminals[0].serving_cell, Some(1));
        let result = state.tick(ModePolicy::Both);
        assert!(!result.terminals[0].handover_occurred);
    }

    #[test]
    fn relocation_is_clamped_and_parks_the_terminal() {
        let mut state = WorldState::reset(two_cells(Point::new(500.0, 0.0))).expect("reset");
        assert!(state.relocate_terminal(0, -20.0, 9000.0));
        let snapshot = state.terminal(0).expect("terminal");
        assert_eq!(snapshot.position, Point::new(0.0, 6000.0));
        assert_eq!(snapshot.target, snapshot.position);
    }

    #[test]
    fn run_covers_the_configured_length_and_feeds_the_sink() {
        let sink = MemorySink::new();
        let mut state = WorldState::reset(two_cells(Point::new(500.0, 0.0)).with_run_length(25))
            .expect("reset")
            .with_sink(sink.clone());
        let results = state.run(ModePolicy::Both);
        assert_eq!(results.len(), 25);
        assert_eq!(state.now(), 25);
        // one metrics row per terminal, per policy, per tick
        assert_eq!(sink.metrics().len(), 50);
        assert!(sink.prb().is_empty());
        let report = state.report();
        assert_eq!(report.ticks, 25);
        assert!(report.dynamic.throughput > report.regular.throughput);
    }
}
