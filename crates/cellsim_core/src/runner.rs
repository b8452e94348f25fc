//! Simulation runner: advances the clock and drives the tick schedule.
//!
//! Clock progression happens here, outside systems. Each tick advances
//! [SimulationClock], inserts the requested [ModePolicy], runs the chained
//! pipeline and drains the terminal snapshots into a [TickResult].

use bevy_ecs::prelude::{Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;
use tracing::trace;

use crate::clock::{ModePolicy, SimulationClock};
use crate::systems::{
    handover::handover_system, housekeeping::clear_handover_flags_system,
    link_views::link_views_system, movement::movement_system,
};
use crate::telemetry::{TickReports, TickResult};

/// Builds the per-tick schedule. The systems are chained: every phase sees
/// the complete output of the previous one.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            movement_system,
            handover_system,
            link_views_system,
            clear_handover_flags_system,
        )
            .chain(),
    );
    schedule
}

/// Processes one tick under `policy` and returns its snapshot.
pub fn run_tick(world: &mut World, schedule: &mut Schedule, policy: ModePolicy) -> TickResult {
    let tick = world.resource_mut::<SimulationClock>().advance();
    world.insert_resource(policy);
    world.resource_mut::<TickReports>().terminals.clear();

    schedule.run(world);

    let terminals = std::mem::take(&mut world.resource_mut::<TickReports>().terminals);
    trace!(tick, terminals = terminals.len(), "tick processed");
    TickResult { tick, terminals }
}

/// Processes `ticks` ticks and invokes `hook` after each one.
pub fn run_ticks_with_hook<F>(
    world: &mut World,
    schedule: &mut Schedule,
    policy: ModePolicy,
    ticks: u64,
    mut hook: F,
) -> Vec<TickResult>
where
    F: FnMut(&World, &TickResult),
{
    let mut results = Vec::with_capacity(ticks as usize);
    for _ in 0..ticks {
        let result = run_tick(world, schedule, policy);
        hook(world, &result);
        results.push(result);
    }
    results
}

pub fn run_ticks(
    world: &mut World,
    schedule: &mut Schedule,
    policy: ModePolicy,
    ticks: u64,
) -> Vec<TickResult> {
    run_ticks_with_hook(world, schedule, policy, ticks, |_, _| {})
}
