//! Test helpers for common test setup and utilities.
//!
//! Fixed two-cell layouts whose radio geometry is known in advance, shared by
//! unit tests, integration tests and benches.

use crate::ecs::Point;
use crate::scenario::{ScenarioParams, TerminalSpec};
use crate::world_state::WorldState;

/// Distance between the two test cells, both on the x axis.
pub const CELL_SPACING: f64 = 2000.0;

/// Two cells at `(0, 0)` and `(CELL_SPACING, 0)`, no obstructions, no fading,
/// no retargeting. One parked terminal per entry of `terminals`.
pub fn two_cell_params(terminals: &[Point]) -> ScenarioParams {
    ScenarioParams::default()
        .with_seed(7)
        .with_fixed_cells([Point::new(0.0, 0.0), Point::new(CELL_SPACING, 0.0)])
        .with_fixed_terminals(
            terminals
                .iter()
                .map(|p| TerminalSpec {
                    position: *p,
                    target: *p,
                })
                .collect(),
        )
        .with_obstructions(0, 50)
        .with_retarget_probability(0.0)
        .without_fading()
}

/// A terminal parked 500 m from cell 0: always served by cell 0.
pub fn stationary_world() -> WorldState {
    build(two_cell_params(&[Point::new(500.0, 0.0)]))
}

/// A terminal parked exactly between the two cells.
pub fn equidistant_world() -> WorldState {
    build(two_cell_params(&[Point::new(CELL_SPACING / 2.0, 0.0)]))
}

/// Builds a world from params known to be valid.
///
/// # Panics
///
/// Panics if `params` fail validation.
pub fn build(params: ScenarioParams) -> WorldState {
    WorldState::reset(params).expect("test params should be valid")
}
