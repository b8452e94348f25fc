//! Log-distance propagation and SINR composition.
//!
//! Received power follows `tx - (128.1 + 37.6 * log10(d_km))`, with the
//! distance floored at 1e-6 km so a terminal on top of a cell stays finite.
//! Interference is aggregated over every cell other than the serving one,
//! in the dB domain, before converting to linear scale.

use crate::ecs::{Cell, Point};

const PATH_LOSS_INTERCEPT_DB: f64 = 128.1;
const PATH_LOSS_SLOPE_DB: f64 = 37.6;
const MIN_DISTANCE_KM: f64 = 1e-6;
const THERMAL_NOISE_DBM_PER_HZ: f64 = -174.0;
const NOISE_FIGURE_DB: f64 = 9.0;

/// How the other cells' received powers combine into one interference term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterferenceAggregation {
    /// Arithmetic mean of the dBm values. Used for handover and reported SINR.
    Mean,
    /// Plain sum of the dBm values. Used for the throughput series samples.
    Sum,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sinr {
    pub linear: f64,
    pub db: f64,
}

impl Sinr {
    pub fn from_linear(linear: f64) -> Self {
        Self {
            linear,
            db: 10.0 * linear.log10(),
        }
    }

    pub fn from_db(db: f64) -> Self {
        Self {
            linear: db_to_linear(db),
            db,
        }
    }
}

pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

pub fn distance(cell: &Cell, position: Point) -> f64 {
    cell.position.distance_to(position)
}

pub fn path_loss_db(distance_m: f64) -> f64 {
    let distance_km = (distance_m / 1000.0).max(MIN_DISTANCE_KM);
    PATH_LOSS_INTERCEPT_DB + PATH_LOSS_SLOPE_DB * distance_km.log10()
}

/// Received power (dBm) at `position` from `cell`.
pub fn signal_strength(cell: &Cell, position: Point) -> f64 {
    cell.tx_power_dbm - path_loss_db(distance(cell, position))
}

/// Thermal noise floor (dBm) over `bandwidth_mhz`, including a 9 dB noise figure.
pub fn noise_floor_dbm(bandwidth_mhz: f64) -> f64 {
    THERMAL_NOISE_DBM_PER_HZ + 10.0 * (bandwidth_mhz * 1e6).log10() + NOISE_FIGURE_DB
}

/// SINR of `serving` at `position` against every other cell in `cells`.
pub fn sinr<'a, I>(
    serving: &Cell,
    cells: I,
    position: Point,
    noise_dbm: f64,
    aggregation: InterferenceAggregation,
) -> Sinr
where
    I: IntoIterator<Item = &'a Cell>,
{
    let mut count = 0usize;
    let mut total_dbm = 0.0;
    for cell in cells.into_iter().filter(|c| c.id != serving.id) {
        total_dbm += signal_strength(cell, position);
        count += 1;
    }

    let interference = match (count, aggregation) {
        (0, _) => 0.0,
        (n, InterferenceAggregation::Mean) => db_to_linear(total_dbm / n as f64),
        (_, InterferenceAggregation::Sum) => db_to_linear(total_dbm),
    };

    let signal = db_to_linear(signal_strength(serving, position));
    let noise = db_to_linear(noise_dbm);
    Sinr::from_linear(signal / (interference + noise))
}
