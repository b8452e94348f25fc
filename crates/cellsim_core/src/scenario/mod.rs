//! Scenario setup: configuration types and the reset that builds a world
//! from them.

mod build;
mod params;

pub use build::{build_scenario, place_obstructions, SimRng};
pub use params::{
    Bounds, CellLayout, CellSpec, MetricsConfig, MobilityConfig, PrbConfig, RadioConfig,
    ScenarioParams, TerminalLayout, TerminalSpec,
};
