//! Parameter variation framework for seed and configuration sweeps.
//!
//! A [`ParameterSpace`] starts from a base [`ScenarioParams`] and lists the
//! values to try per dimension. Empty dimensions keep the base value. Grid
//! search expands the Cartesian product; random sampling draws unique
//! combinations.

use std::collections::HashSet;
use std::path::Path;

use cellsim_core::{ModePolicy, ScenarioParams};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SEED_MIX: u64 = 0x9e3779b9;

/// One run: a full scenario configuration plus its identity and seed.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    pub params: ScenarioParams,
    pub experiment_id: String,
    pub run_id: usize,
    pub seed: u64,
    pub policy: ModePolicy,
}

impl ParameterSet {
    pub fn new(params: ScenarioParams, experiment_id: String, run_id: usize, seed: u64) -> Self {
        Self {
            params,
            experiment_id,
            run_id,
            seed,
            policy: ModePolicy::Both,
        }
    }

    /// The configuration handed to the engine, seeded with this run's seed.
    pub fn scenario_params(&self) -> ScenarioParams {
        self.params.clone().with_seed(self.seed)
    }
}

/// Reads a scenario configuration from a JSON file. Missing fields take
/// their defaults.
pub fn load_scenario_params(
    path: impl AsRef<Path>,
) -> Result<ScenarioParams, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ParameterCombination {
    cells: Option<usize>,
    terminals_per_cell: Option<usize>,
    bandwidth: f64,
    look_back: u64,
    look_forward: u64,
    dynamic_allocation: bool,
}

impl ParameterCombination {
    fn apply(&self, base: &ScenarioParams) -> ScenarioParams {
        let mut params = base.clone();
        if let Some(count) = self.cells {
            params = params.with_random_cells(count);
        }
        if let Some(per_cell) = self.terminals_per_cell {
            params = params.with_terminals_per_cell(per_cell);
        }
        params.bandwidth = self.bandwidth;
        params.prb.look_back = self.look_back;
        params.prb.look_forward = self.look_forward;
        params.dynamic_allocation = self.dynamic_allocation;
        params
    }
}

/// Values per dimension, with the base value standing in for an empty list.
struct ParameterVariations {
    cells: Vec<Option<usize>>,
    terminals_per_cell: Vec<Option<usize>>,
    bandwidths: Vec<f64>,
    look_back: Vec<u64>,
    look_forward: Vec<u64>,
    dynamic_allocation: Vec<bool>,
}

fn or_base<T: Clone>(values: &[T], base: T) -> Vec<T> {
    if values.is_empty() {
        vec![base]
    } else {
        values.to_vec()
    }
}

fn optional<T: Copy>(values: &[T]) -> Vec<Option<T>> {
    if values.is_empty() {
        vec![None]
    } else {
        values.iter().copied().map(Some).collect()
    }
}

fn pick<T: Copy, R: Rng>(values: &[T], rng: &mut R) -> T {
    values[rng.gen_range(0..values.len())]
}

impl ParameterVariations {
    fn from_space(space: &ParameterSpace) -> Self {
        let base = &space.base;
        Self {
            cells: optional(&space.cell_counts),
            terminals_per_cell: optional(&space.terminals_per_cell),
            bandwidths: or_base(&space.bandwidths, base.bandwidth),
            look_back: or_base(&space.look_back, base.prb.look_back),
            look_forward: or_base(&space.look_forward, base.prb.look_forward),
            dynamic_allocation: or_base(&space.dynamic_allocation, base.dynamic_allocation),
        }
    }

    /// Cartesian product, last dimension varying fastest.
    fn combinations(&self) -> Vec<ParameterCombination> {
        self.cells
            .iter()
            .flat_map(|&cells| {
                self.terminals_per_cell.iter().flat_map(move |&terminals_per_cell| {
                    self.bandwidths.iter().flat_map(move |&bandwidth| {
                        self.look_back.iter().flat_map(move |&look_back| {
                            self.look_forward.iter().flat_map(move |&look_forward| {
                                self.dynamic_allocation.iter().map(move |&dynamic_allocation| {
                                    ParameterCombination {
                                        cells,
                                        terminals_per_cell,
                                        bandwidth,
                                        look_back,
                                        look_forward,
                                        dynamic_allocation,
                                    }
                                })
                            })
                        })
                    })
                })
            })
            .collect()
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> ParameterCombination {
        ParameterCombination {
            cells: pick(&self.cells, rng),
            terminals_per_cell: pick(&self.terminals_per_cell, rng),
            bandwidth: pick(&self.bandwidths, rng),
            look_back: pick(&self.look_back, rng),
            look_forward: pick(&self.look_forward, rng),
            dynamic_allocation: pick(&self.dynamic_allocation, rng),
        }
    }
}

/// Defines the values to explore for each parameter.
#[derive(Debug, Clone)]
pub struct ParameterSpace {
    base: ScenarioParams,
    cell_counts: Vec<usize>,
    terminals_per_cell: Vec<usize>,
    bandwidths: Vec<f64>,
    look_back: Vec<u64>,
    look_forward: Vec<u64>,
    dynamic_allocation: Vec<bool>,
    replications: usize,
    policy: ModePolicy,
}

impl ParameterSpace {
    pub fn new(base: ScenarioParams) -> Self {
        Self {
            base,
            cell_counts: Vec::new(),
            terminals_per_cell: Vec::new(),
            bandwidths: Vec::new(),
            look_back: Vec::new(),
            look_forward: Vec::new(),
            dynamic_allocation: Vec::new(),
            replications: 1,
            policy: ModePolicy::Both,
        }
    }

    /// Grid search over the default scenario.
    pub fn grid() -> Self {
        Self::new(ScenarioParams::default())
    }

    pub fn base(mut self, base: ScenarioParams) -> Self {
        self.base = base;
        self
    }

    /// Random cell layouts with these cell counts.
    pub fn cell_counts(mut self, values: Vec<usize>) -> Self {
        self.cell_counts = values;
        self
    }

    pub fn terminals_per_cell(mut self, values: Vec<usize>) -> Self {
        self.terminals_per_cell = values;
        self
    }

    pub fn bandwidths(mut self, values: Vec<f64>) -> Self {
        self.bandwidths = values;
        self
    }

    pub fn look_back(mut self, values: Vec<u64>) -> Self {
        self.look_back = values;
        self
    }

    pub fn look_forward(mut self, values: Vec<u64>) -> Self {
        self.look_forward = values;
        self
    }

    pub fn dynamic_allocation(mut self, values: Vec<bool>) -> Self {
        self.dynamic_allocation = values;
        self
    }

    /// Independent seeds per combination. Zero is treated as one.
    pub fn replications(mut self, replications: usize) -> Self {
        self.replications = replications.max(1);
        self
    }

    pub fn policy(mut self, policy: ModePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn parameter_set(
        &self,
        params: ScenarioParams,
        experiment_id: String,
        run_id: usize,
        seed: u64,
    ) -> ParameterSet {
        let mut set = ParameterSet::new(params, experiment_id, run_id, seed);
        set.policy = self.policy;
        set
    }

    /// Generate every combination (grid search), each repeated
    /// `replications` times with distinct seeds.
    pub fn generate(&self) -> Vec<ParameterSet> {
        let base_seed = self.base.seed.unwrap_or(0);
        ParameterVariations::from_space(self)
            .combinations()
            .into_iter()
            .enumerate()
            .flat_map(|(experiment_id, combo)| {
                let params = combo.apply(&self.base);
                (0..self.replications).map(move |run_id| {
                    let seed = base_seed
                        .wrapping_add((experiment_id as u64).wrapping_mul(SEED_MIX))
                        .wrapping_add(run_id as u64);
                    (params.clone(), experiment_id, run_id, seed)
                })
            })
            .map(|(params, experiment_id, run_id, seed)| {
                self.parameter_set(params, format!("exp_{experiment_id}"), run_id, seed)
            })
            .collect()
    }

    /// Generate random parameter sets (Monte Carlo sampling).
    ///
    /// Draws up to `count` unique combinations; stops early when the space
    /// has fewer distinct combinations than requested.
    pub fn sample_random(&self, count: usize, seed: u64) -> Vec<ParameterSet> {
        let variations = ParameterVariations::from_space(self);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut parameter_sets = Vec::new();
        let mut seen = HashSet::new();
        let mut attempts = 0;
        const MAX_ATTEMPTS: usize = 10000;

        while parameter_sets.len() < count && attempts < MAX_ATTEMPTS {
            attempts += 1;
            let combo = variations.sample(&mut rng);
            if !seen.insert(format!("{combo:?}")) {
                continue;
            }

            let seed_value = seed
                .wrapping_add(parameter_sets.len() as u64)
                .wrapping_mul(SEED_MIX);
            let id = format!("random_{}", parameter_sets.len());
            parameter_sets.push(self.parameter_set(combo.apply(&self.base), id, 0, seed_value));
        }

        parameter_sets
    }
}

impl Default for ParameterSpace {
    fn default() -> Self {
        Self::grid()
    }
}
