#![allow(dead_code)]

use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use cellsim_core::clock::ModePolicy;
use cellsim_core::runner::{run_tick, run_ticks, simulation_schedule};
use cellsim_core::scenario::{build_scenario, ScenarioParams};
use cellsim_core::TickResult;

/// Owns a raw world plus a reusable `Schedule`, for tests that inspect ECS
/// state directly instead of going through `WorldState`.
pub struct ScheduleRunner {
    pub world: World,
    schedule: Schedule,
}

impl ScheduleRunner {
    pub fn new(params: &ScenarioParams) -> Self {
        let mut world = World::new();
        build_scenario(&mut world, params).expect("test params should be valid");
        Self {
            world,
            schedule: simulation_schedule(),
        }
    }

    pub fn run_one(&mut self, policy: ModePolicy) -> TickResult {
        run_tick(&mut self.world, &mut self.schedule, policy)
    }

    pub fn run(&mut self, policy: ModePolicy, ticks: u64) -> Vec<TickResult> {
        run_ticks(&mut self.world, &mut self.schedule, policy, ticks)
    }
}
