use bevy_ecs::prelude::{Resource, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::clock::{RunLength, SimulationClock};
use crate::ecs::{
    Cell, CellId, MovementTarget, ObstructionZone, Point, PolicySeries, Position, ServingLink,
    Terminal, TerminalId,
};
use crate::error::ConfigError;
use crate::metrics::PolicyAggregates;
use crate::mobility::{clamp_to_area, sample_in_bounds};
use crate::propagation::noise_floor_dbm;
use crate::scenario::params::{CellLayout, ScenarioParams, TerminalLayout};
use crate::sink::RecordSinkResource;
use crate::telemetry::{HandoverLog, TickReports};

/// Rejection-sampling budget for the obstruction zones of one cell.
const MAX_PLACEMENT_ATTEMPTS: usize = 10_000;

const MOBILITY_STREAM: u64 = 0x5eed_cafe;
const FADING_STREAM: u64 = 0xfade_0001;
const METRICS_STREAM: u64 = 0x0e7a_1c5d;

fn stream(seed: Option<u64>, salt: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ salt),
        None => StdRng::from_entropy(),
    }
}

/// Independent random streams, one per stochastic concern, so that e.g.
/// toggling fading does not shift the mobility draws.
#[derive(Resource)]
pub struct SimRng {
    pub mobility: StdRng,
    pub fading: StdRng,
    pub metrics: StdRng,
}

impl SimRng {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            mobility: stream(seed, MOBILITY_STREAM),
            fading: stream(seed, FADING_STREAM),
            metrics: stream(seed, METRICS_STREAM),
        }
    }
}

/// Places `count` non-overlapping square zones around `center`. Corners are
/// integers in `[center - radius, center + radius - size)` on both axes.
pub fn place_obstructions<R: Rng>(
    rng: &mut R,
    cell: CellId,
    center: Point,
    radius: f64,
    count: usize,
    size: i64,
) -> Result<Vec<ObstructionZone>, ConfigError> {
    let mut zones: Vec<ObstructionZone> = Vec::with_capacity(count);
    if count == 0 {
        return Ok(zones);
    }
    let x_lo = (center.x - radius).round() as i64;
    let x_hi = (center.x + radius).round() as i64 - size;
    let y_lo = (center.y - radius).round() as i64;
    let y_hi = (center.y + radius).round() as i64 - size;
    let placement_error = |placed| ConfigError::ObstructionPlacement {
        cell,
        requested: count,
        placed,
    };
    if x_hi <= x_lo || y_hi <= y_lo {
        return Err(placement_error(0));
    }

    for _ in 0..MAX_PLACEMENT_ATTEMPTS {
        let candidate = ObstructionZone {
            x: rng.gen_range(x_lo..x_hi),
            y: rng.gen_range(y_lo..y_hi),
            size,
        };
        if zones.iter().all(|z| !z.overlaps(&candidate)) {
            zones.push(candidate);
            if zones.len() == count {
                return Ok(zones);
            }
        }
    }
    Err(placement_error(zones.len()))
}

fn spawn_cells(
    world: &mut World,
    params: &ScenarioParams,
    rng: &mut StdRng,
) -> Result<Vec<Point>, ConfigError> {
    let area_max = params.mobility.area_max;
    let positions: Vec<Point> = match &params.cells {
        CellLayout::Random { count, bounds } => (0..*count)
            .map(|_| clamp_to_area(sample_in_bounds(rng, bounds), area_max))
            .collect(),
        CellLayout::Fixed(specs) => specs
            .iter()
            .map(|s| clamp_to_area(s.position, area_max))
            .collect(),
    };

    for (index, position) in positions.iter().enumerate() {
        let id = index as CellId;
        let obstructions = place_obstructions(
            rng,
            id,
            *position,
            params.cell_radius,
            params.obstruction_count,
            params.obstruction_size,
        )?;
        world.spawn(Cell {
            id,
            position: *position,
            tx_power_dbm: params.tx_power_dbm,
            radius: params.cell_radius,
            obstructions,
        });
    }
    Ok(positions)
}

fn terminal_placements(
    params: &ScenarioParams,
    cells: &[Point],
    rng: &mut StdRng,
) -> Vec<(Point, Point)> {
    let area_max = params.mobility.area_max;
    match &params.terminals {
        TerminalLayout::PerCell {
            per_cell,
            x_offset,
            y_offset,
            target_spread,
        } => {
            let mut placements = Vec::with_capacity(cells.len() * per_cell);
            for cell in cells {
                for _ in 0..*per_cell {
                    let position = Point::new(
                        cell.x - rng.gen_range(x_offset.0..=x_offset.1),
                        cell.y - rng.gen_range(y_offset.0..=y_offset.1),
                    );
                    let target = Point::new(
                        cell.x + rng.gen_range(-target_spread..=*target_spread),
                        cell.y + rng.gen_range(-target_spread..=*target_spread),
                    );
                    placements.push((clamp_to_area(position, area_max), clamp_to_area(target, area_max)));
                }
            }
            placements
        }
        TerminalLayout::Fixed(specs) => specs
            .iter()
            .map(|s| {
                (
                    clamp_to_area(s.position, area_max),
                    clamp_to_area(s.target, area_max),
                )
            })
            .collect(),
    }
}

/// Validates `params`, spawns cells and terminals and inserts every resource
/// the tick schedule reads. `world` is expected to be empty.
pub fn build_scenario(world: &mut World, params: &ScenarioParams) -> Result<(), ConfigError> {
    params.validate()?;

    let mut layout_rng = stream(params.seed, 0);
    let cells = spawn_cells(world, params, &mut layout_rng)?;
    let placements = terminal_placements(params, &cells, &mut layout_rng);

    let noise_dbm = noise_floor_dbm(params.bandwidth);
    for (index, (position, target)) in placements.iter().enumerate() {
        world.spawn((
            Terminal {
                id: index as TerminalId,
                bandwidth: params.bandwidth,
                dynamic_allocation: params.dynamic_allocation,
                noise_dbm,
            },
            Position(*position),
            MovementTarget(*target),
            ServingLink::default(),
            PolicySeries::default(),
        ));
    }

    world.insert_resource(SimulationClock::default());
    world.insert_resource(RunLength(params.run_length));
    world.insert_resource(params.radio.clone());
    world.insert_resource(params.mobility);
    world.insert_resource(params.prb);
    world.insert_resource(params.metrics);
    world.insert_resource(SimRng::new(params.seed));
    world.insert_resource(PolicyAggregates::default());
    world.insert_resource(HandoverLog::default());
    world.insert_resource(TickReports::default());
    if !world.contains_resource::<RecordSinkResource>() {
        world.insert_resource(RecordSinkResource::default());
    }

    info!(
        cells = cells.len(),
        terminals = placements.len(),
        seed = ?params.seed,
        "scenario built"
    );
    Ok(())
}
