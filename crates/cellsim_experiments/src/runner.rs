//! Parallel simulation execution using rayon.
//!
//! Every run owns its own `WorldState`, so runs share nothing and can be
//! spread across a thread pool.

use cellsim_core::error::SinkError;
use cellsim_core::handover::HandoverEvent;
use cellsim_core::sink::{MemorySink, NullSink, RecordSink, SimRecord};
use cellsim_core::{ComparisonReport, ConfigError, TickResult, WorldState};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::metrics::{extract_metrics, layout_label, SimulationResult};
use crate::parameters::ParameterSet;

/// Everything a single run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationArtifacts {
    pub metrics: SimulationResult,
    pub report: ComparisonReport,
    pub ticks: Vec<TickResult>,
    pub handovers: Vec<HandoverEvent>,
}

/// Copies every record into an in-memory buffer before passing it on.
struct Tee {
    memory: MemorySink,
    downstream: Box<dyn RecordSink>,
}

impl RecordSink for Tee {
    fn record(&mut self, record: &SimRecord) -> Result<(), SinkError> {
        self.memory.record(record)?;
        self.downstream.record(record)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.downstream.flush()
    }
}

/// Runs one parameter set for its configured run length, writing every
/// record to `sink` as well.
pub fn run_single_simulation_with_sink(
    param_set: &ParameterSet,
    sink: Box<dyn RecordSink>,
) -> Result<SimulationArtifacts, ConfigError> {
    let memory = MemorySink::new();
    let mut state = WorldState::reset(param_set.scenario_params())?.with_sink(Tee {
        memory: memory.clone(),
        downstream: sink,
    });
    debug!(
        experiment = %param_set.experiment_id,
        run = param_set.run_id,
        seed = param_set.seed,
        layout = %layout_label(param_set),
        "simulation started"
    );

    let ticks = state.run(param_set.policy);
    let report = state.report();
    let metrics = extract_metrics(&state, param_set, &report, &memory.prb());

    Ok(SimulationArtifacts {
        metrics,
        report,
        ticks,
        handovers: state.handover_log().to_vec(),
    })
}

/// Shared primitive of local sweeps: runs one parameter set to completion
/// and returns its metrics plus the raw tick snapshots.
pub fn run_single_simulation_with_artifacts(
    param_set: &ParameterSet,
) -> Result<SimulationArtifacts, ConfigError> {
    run_single_simulation_with_sink(param_set, Box::new(NullSink))
}

pub fn run_single_simulation(param_set: &ParameterSet) -> Result<SimulationResult, ConfigError> {
    Ok(run_single_simulation_with_artifacts(param_set)?.metrics)
}

/// Run multiple simulations in parallel with a progress bar.
///
/// Results keep the order of `parameter_sets`. Runs whose configuration is
/// rejected are logged and left out.
pub fn run_parallel_experiments(
    parameter_sets: Vec<ParameterSet>,
    num_threads: Option<usize>,
) -> Result<Vec<SimulationResult>, rayon::ThreadPoolBuildError> {
    run_parallel_experiments_with_progress(parameter_sets, num_threads, true)
}

pub fn run_parallel_experiments_with_progress(
    parameter_sets: Vec<ParameterSet>,
    num_threads: Option<usize>,
    show_progress: bool,
) -> Result<Vec<SimulationResult>, rayon::ThreadPoolBuildError> {
    let total = parameter_sets.len();
    let pb = if show_progress && total > 0 {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        Some(bar)
    } else {
        None
    };

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = num_threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder.build()?;
    info!(runs = total, threads = pool.current_num_threads(), "sweep started");

    let pb_clone = pb.clone();
    let results: Vec<Option<SimulationResult>> = pool.install(|| {
        parameter_sets
            .par_iter()
            .map(|param_set| {
                let result = match run_single_simulation(param_set) {
                    Ok(result) => Some(result),
                    Err(err) => {
                        warn!(
                            experiment = %param_set.experiment_id,
                            run = param_set.run_id,
                            error = %err,
                            "run skipped"
                        );
                        None
                    }
                };
                if let Some(ref progress_bar) = pb_clone {
                    progress_bar.inc(1);
                }
                result
            })
            .collect()
    });

    if let Some(ref progress_bar) = pb {
        progress_bar.finish_with_message("Completed");
    }

    let results: Vec<SimulationResult> = results.into_iter().flatten().collect();
    info!(completed = results.len(), skipped = total - results.len(), "sweep finished");
    Ok(results)
}
