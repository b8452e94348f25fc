#![allow(dead_code)]

use cellsim_core::ecs::Point;
use cellsim_core::scenario::{ScenarioParams, TerminalSpec};
use cellsim_core::sink::MemorySink;
use cellsim_core::WorldState;

/// Builder configuration for reproducible test worlds.
#[derive(Clone, Debug)]
pub struct TestWorldConfig {
    pub seed: u64,
    pub cells: Vec<Point>,
    pub terminals: Vec<TerminalSpec>,
    pub fading: bool,
    pub retarget_probability: f64,
    pub dynamic_allocation: bool,
    pub run_length: u64,
}

impl Default for TestWorldConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            cells: vec![Point::new(0.0, 0.0), Point::new(2000.0, 0.0)],
            terminals: Vec::new(),
            fading: false,
            retarget_probability: 0.0,
            dynamic_allocation: false,
            run_length: 200,
        }
    }
}

/// Builds worlds with a fixed geometry so radio outcomes are known up front.
#[derive(Debug, Default)]
pub struct TestWorldBuilder {
    config: TestWorldConfig,
}

impl TestWorldBuilder {
    /// Create a new builder with the default two-cell layout.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Replace the cell layout.
    pub fn with_cells(mut self, cells: impl IntoIterator<Item = Point>) -> Self {
        self.config.cells = cells.into_iter().collect();
        self
    }

    /// Add a terminal parked at `at` (its target is its own position).
    pub fn with_parked_terminal(mut self, at: Point) -> Self {
        self.config.terminals.push(TerminalSpec {
            position: at,
            target: at,
        });
        self
    }

    /// Add a terminal that walks from `from` toward `to`.
    pub fn with_walking_terminal(mut self, from: Point, to: Point) -> Self {
        self.config.terminals.push(TerminalSpec {
            position: from,
            target: to,
        });
        self
    }

    pub fn with_fading(mut self) -> Self {
        self.config.fading = true;
        self
    }

    pub fn with_retarget_probability(mut self, probability: f64) -> Self {
        self.config.retarget_probability = probability;
        self
    }

    pub fn with_dynamic_allocation(mut self) -> Self {
        self.config.dynamic_allocation = true;
        self
    }

    pub fn with_run_length(mut self, ticks: u64) -> Self {
        self.config.run_length = ticks;
        self
    }

    pub fn params(&self) -> ScenarioParams {
        let config = &self.config;
        let mut params = ScenarioParams::default()
            .with_seed(config.seed)
            .with_fixed_cells(config.cells.iter().copied())
            .with_fixed_terminals(config.terminals.clone())
            .with_obstructions(0, 50)
            .with_retarget_probability(config.retarget_probability)
            .with_dynamic_allocation(config.dynamic_allocation)
            .with_run_length(config.run_length);
        if !config.fading {
            params = params.without_fading();
        }
        params
    }

    pub fn build(self) -> WorldState {
        WorldState::reset(self.params()).expect("test world params should be valid")
    }

    /// Build the world with an in-memory sink and return a handle to it.
    pub fn build_with_sink(self) -> (WorldState, MemorySink) {
        let sink = MemorySink::new();
        let state = self.build().with_sink(sink.clone());
        (state, sink)
    }
}
