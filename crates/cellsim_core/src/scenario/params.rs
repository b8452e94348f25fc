use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::ecs::Point;
use crate::error::{ensure_count, ensure_positive, ensure_probability, ensure_range, ConfigError};

/// Side of the square service area (meters). Positions live in `[0, area_max]`.
const DEFAULT_AREA_MAX: f64 = 6000.0;

const DEFAULT_RUN_LENGTH: u64 = 200;

/// Axis-aligned rectangle used for sampling positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Bounds {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    fn validate(&self, field: &'static str, area_max: f64) -> Result<(), ConfigError> {
        ensure_range(field, self.x_min, self.x_max)?;
        ensure_range(field, self.y_min, self.y_max)?;
        let inside = |v: f64| (0.0..=area_max).contains(&v);
        if inside(self.x_min) && inside(self.x_max) && inside(self.y_min) && inside(self.y_max) {
            Ok(())
        } else {
            Err(ConfigError::OutsideArea { field, area_max })
        }
    }
}

/// Terminal movement: fixed step toward a target with random retargeting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct MobilityConfig {
    /// Distance covered per tick.
    pub step_size: f64,
    pub area_max: f64,
    /// Chance per tick of drawing a new movement target.
    pub retarget_probability: f64,
    pub retarget_bounds: Bounds,
}

impl Default for MobilityConfig {
    fn default() -> Self {
        Self {
            step_size: 1.2,
            area_max: DEFAULT_AREA_MAX,
            retarget_probability: 0.1,
            retarget_bounds: Bounds::new(100.0, 900.0, 100.0, 700.0),
        }
    }
}

/// Handover evaluation and throughput estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct RadioConfig {
    /// Extra bandwidth granted in dynamic mode.
    pub bandwidth_bonus: f64,
    /// Guaranteed rate used by the outage-probability gate.
    pub min_required_throughput: f64,
    /// Exponential decay constant (lambda) of the outage model.
    pub outage_decay: f64,
    /// Candidates need an outage probability above this to be eligible.
    pub eligibility_threshold: f64,
    /// Fading losses (dB) drawn uniformly when inside a cell's radius. Empty disables fading.
    pub fading_losses_db: Vec<f64>,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            bandwidth_bonus: 10.0,
            min_required_throughput: 10.0,
            outage_decay: 0.01,
            eligibility_threshold: 0.5,
            fading_losses_db: vec![-2.0, -3.0, -4.0],
        }
    }
}

/// PRB accounting and compensation windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct PrbConfig {
    /// Bandwidth carried by one resource block.
    pub prb_bandwidth_unit: f64,
    /// Blocks allocated to every terminal before compensation.
    pub baseline_prbs: u64,
    pub look_back: u64,
    pub look_forward: u64,
}

impl Default for PrbConfig {
    fn default() -> Self {
        Self {
            prb_bandwidth_unit: 20.0,
            baseline_prbs: 25,
            look_back: 30,
            look_forward: 30,
        }
    }
}

/// Constants of the latency and energy KPIs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct MetricsConfig {
    /// Transmission bandwidth of the regular policy's latency model.
    pub regular_latency_bandwidth: f64,
    pub latency_jitter_min: f64,
    pub latency_jitter_max: f64,
    pub energy_per_throughput: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            regular_latency_bandwidth: 40.0,
            latency_jitter_min: 5.0,
            latency_jitter_max: 10.0,
            energy_per_throughput: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellSpec {
    pub position: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminalSpec {
    pub position: Point,
    pub target: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellLayout {
    /// `count` cells placed uniformly in `bounds`.
    Random { count: usize, bounds: Bounds },
    Fixed(Vec<CellSpec>),
}

impl Default for CellLayout {
    fn default() -> Self {
        CellLayout::Random {
            count: 5,
            bounds: Bounds::new(100.0, 3000.0, 100.0, 3000.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalLayout {
    /// `per_cell` terminals spawned `offset` below and left of each cell,
    /// heading for a target within `target_spread` of that cell.
    PerCell {
        per_cell: usize,
        x_offset: (f64, f64),
        y_offset: (f64, f64),
        target_spread: f64,
    },
    Fixed(Vec<TerminalSpec>),
}

impl Default for TerminalLayout {
    fn default() -> Self {
        TerminalLayout::PerCell {
            per_cell: 1,
            x_offset: (500.0, 2500.0),
            y_offset: (500.0, 1500.0),
            target_spread: 50.0,
        }
    }
}

/// Parameters for building a simulation scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    /// Seed for every random stream. `None` draws from entropy.
    pub seed: Option<u64>,
    pub cells: CellLayout,
    pub terminals: TerminalLayout,
    pub tx_power_dbm: f64,
    pub cell_radius: f64,
    pub obstruction_count: usize,
    pub obstruction_size: i64,
    /// Nominal bandwidth of every terminal.
    pub bandwidth: f64,
    pub dynamic_allocation: bool,
    pub radio: RadioConfig,
    pub mobility: MobilityConfig,
    pub prb: PrbConfig,
    pub metrics: MetricsConfig,
    pub run_length: u64,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            seed: None,
            cells: CellLayout::default(),
            terminals: TerminalLayout::default(),
            tx_power_dbm: 46.0,
            cell_radius: 1000.0,
            obstruction_count: 20,
            obstruction_size: 50,
            bandwidth: 20.0,
            dynamic_allocation: false,
            radio: RadioConfig::default(),
            mobility: MobilityConfig::default(),
            prb: PrbConfig::default(),
            metrics: MetricsConfig::default(),
            run_length: DEFAULT_RUN_LENGTH,
        }
    }
}

impl ScenarioParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_random_cells(mut self, count: usize) -> Self {
        let bounds = match self.cells {
            CellLayout::Random { bounds, .. } => bounds,
            CellLayout::Fixed(_) => Bounds::new(100.0, 3000.0, 100.0, 3000.0),
        };
        self.cells = CellLayout::Random { count, bounds };
        self
    }

    pub fn with_fixed_cells(mut self, positions: impl IntoIterator<Item = Point>) -> Self {
        self.cells = CellLayout::Fixed(
            positions
                .into_iter()
                .map(|position| CellSpec { position })
                .collect(),
        );
        self
    }

    pub fn with_terminals_per_cell(mut self, per_cell: usize) -> Self {
        if let TerminalLayout::PerCell {
            per_cell: ref mut n,
            ..
        } = self.terminals
        {
            *n = per_cell;
        } else {
            self.terminals = TerminalLayout::PerCell {
                per_cell,
                x_offset: (500.0, 2500.0),
                y_offset: (500.0, 1500.0),
                target_spread: 50.0,
            };
        }
        self
    }

    pub fn with_fixed_terminals(mut self, terminals: Vec<TerminalSpec>) -> Self {
        self.terminals = TerminalLayout::Fixed(terminals);
        self
    }

    pub fn with_obstructions(mut self, count: usize, size: i64) -> Self {
        self.obstruction_count = count;
        self.obstruction_size = size;
        self
    }

    pub fn with_bandwidth(mut self, bandwidth: f64) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    pub fn with_dynamic_allocation(mut self, enabled: bool) -> Self {
        self.dynamic_allocation = enabled;
        self
    }

    pub fn with_radio(mut self, radio: RadioConfig) -> Self {
        self.radio = radio;
        self
    }

    /// Disables the fading draw of the handover evaluation.
    pub fn without_fading(mut self) -> Self {
        self.radio.fading_losses_db.clear();
        self
    }

    pub fn with_mobility(mut self, mobility: MobilityConfig) -> Self {
        self.mobility = mobility;
        self
    }

    pub fn with_retarget_probability(mut self, probability: f64) -> Self {
        self.mobility.retarget_probability = probability;
        self
    }

    pub fn with_prb(mut self, prb: PrbConfig) -> Self {
        self.prb = prb;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_run_length(mut self, ticks: u64) -> Self {
        self.run_length = ticks;
        self
    }

    /// Checks every parameter; `build_scenario` refuses invalid params.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let area_max = self.mobility.area_max;
        ensure_positive("area_max", area_max)?;
        ensure_positive("cell_radius", self.cell_radius)?;
        ensure_positive("obstruction_size", self.obstruction_size as f64)?;
        ensure_positive("bandwidth", self.bandwidth)?;
        ensure_count("run_length", self.run_length as usize)?;

        match &self.cells {
            CellLayout::Random { count, bounds } => {
                ensure_count("cell count", *count)?;
                bounds.validate("cell bounds", area_max)?;
            }
            CellLayout::Fixed(specs) => {
                ensure_count("fixed cells", specs.len())?;
                if specs.iter().any(|s| !point_in_area(s.position, area_max)) {
                    return Err(ConfigError::OutsideArea {
                        field: "fixed cell position",
                        area_max,
                    });
                }
            }
        }

        match &self.terminals {
            TerminalLayout::PerCell {
                per_cell,
                x_offset,
                y_offset,
                target_spread,
            } => {
                ensure_count("terminals per cell", *per_cell)?;
                ensure_range("terminal x offset", x_offset.0, x_offset.1)?;
                ensure_range("terminal y offset", y_offset.0, y_offset.1)?;
                if target_spread.is_nan() || *target_spread < 0.0 {
                    return Err(ConfigError::NonPositive {
                        field: "target_spread",
                        value: *target_spread,
                    });
                }
            }
            TerminalLayout::Fixed(specs) => ensure_count("fixed terminals", specs.len())?,
        }

        let radio = &self.radio;
        ensure_positive("bandwidth_bonus", radio.bandwidth_bonus)?;
        ensure_positive("min_required_throughput", radio.min_required_throughput)?;
        ensure_positive("outage_decay", radio.outage_decay)?;
        ensure_probability("eligibility_threshold", radio.eligibility_threshold)?;

        let mobility = &self.mobility;
        ensure_positive("step_size", mobility.step_size)?;
        ensure_probability("retarget_probability", mobility.retarget_probability)?;
        mobility.retarget_bounds.validate("retarget bounds", area_max)?;

        let prb = &self.prb;
        ensure_positive("prb_bandwidth_unit", prb.prb_bandwidth_unit)?;
        ensure_count("look_back", prb.look_back as usize)?;
        ensure_count("look_forward", prb.look_forward as usize)?;

        let metrics = &self.metrics;
        ensure_positive("regular_latency_bandwidth", metrics.regular_latency_bandwidth)?;
        ensure_range(
            "latency jitter",
            metrics.latency_jitter_min,
            metrics.latency_jitter_max,
        )?;
        if metrics.latency_jitter_min >= metrics.latency_jitter_max {
            return Err(ConfigError::InvertedRange {
                field: "latency jitter",
                min: metrics.latency_jitter_min,
                max: metrics.latency_jitter_max,
            });
        }
        ensure_positive("energy_per_throughput", metrics.energy_per_throughput)?;
        Ok(())
    }
}

fn point_in_area(point: Point, area_max: f64) -> bool {
    (0.0..=area_max).contains(&point.x) && (0.0..=area_max).contains(&point.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(ScenarioParams::default().validate(), Ok(()));
    }

    #[test]
    fn zero_bandwidth_is_rejected() {
        let err = ScenarioParams::default().with_bandwidth(0.0).validate();
        assert_eq!(
            err,
            Err(ConfigError::NonPositive {
                field: "bandwidth",
                value: 0.0
            })
        );
    }

    #[test]
    fn empty_layouts_are_rejected() {
        let params = ScenarioParams::default().with_random_cells(0);
        assert!(matches!(
            params.validate(),
            Err(ConfigError::ZeroCount { .. })
        ));
        let params = ScenarioParams::default().with_fixed_terminals(Vec::new());
        assert!(matches!(
            params.validate(),
            Err(ConfigError::ZeroCount { .. })
        ));
    }

    #[test]
    fn fixed_cells_must_lie_in_the_area() {
        let params =
            ScenarioParams::default().with_fixed_cells([Point::new(100.0, 100.0), Point::new(-1.0, 0.0)]);
        assert!(matches!(
            params.validate(),
            Err(ConfigError::OutsideArea { .. })
        ));
    }

    #[test]
    fn probabilities_are_bounded() {
        let params = ScenarioParams::default().with_retarget_probability(1.2);
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvalidProbability { .. })
        ));
    }

    #[test]
    fn zero_windows_are_rejected() {
        let params = ScenarioParams::default().with_prb(PrbConfig {
            look_forward: 0,
            ..PrbConfig::default()
        });
        assert_eq!(
            params.validate(),
            Err(ConfigError::ZeroCount {
                field: "look_forward"
            })
        );
    }

    #[test]
    fn params_parse_from_partial_json() {
        let json = r#"{ "seed": 7, "bandwidth": 15.0, "prb": { "look_back": 10 } }"#;
        let params: ScenarioParams = serde_json::from_str(json).expect("parse");
        assert_eq!(params.seed, Some(7));
        assert_eq!(params.bandwidth, 15.0);
        assert_eq!(params.prb.look_back, 10);
        assert_eq!(params.prb.look_forward, 30);
        assert_eq!(params.cells, CellLayout::default());
    }
}
