//! Metrics extraction from completed runs.
//!
//! A [`SimulationResult`] flattens one run into a single row: the parameters
//! that varied, handover and PRB activity, the per-tick averages of both
//! policies and the comparison percentages.

use cellsim_core::metrics::ComparisonReport;
use cellsim_core::scenario::{CellLayout, TerminalLayout};
use cellsim_core::sink::PrbRecord;
use cellsim_core::WorldState;
use serde::{Deserialize, Serialize};

use crate::parameters::ParameterSet;

/// Aggregated metrics from a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub experiment_id: String,
    pub run_id: usize,
    pub seed: u64,
    /// Number of cells spawned.
    pub cells: usize,
    /// Number of terminals spawned.
    pub terminals: usize,
    pub bandwidth: f64,
    pub dynamic_allocation: bool,
    pub look_back: u64,
    pub look_forward: u64,
    /// Ticks processed.
    pub ticks: u64,
    /// Serving-cell switches, forced ones included.
    pub handovers: usize,
    /// Handovers that produced a PRB requirement.
    pub prb_events: usize,
    /// Mean allocated PRBs over the PRB events, 0 without events.
    pub mean_allocated_prbs: f64,
    pub max_allocated_prbs: u64,
    pub dynamic_latency: f64,
    pub dynamic_packet_loss: f64,
    pub dynamic_throughput: f64,
    pub dynamic_energy: f64,
    pub regular_latency: f64,
    pub regular_packet_loss: f64,
    pub regular_throughput: f64,
    pub regular_energy: f64,
    pub latency_reduction_pct: f64,
    pub packet_loss_reduction_pct: f64,
    pub throughput_increase_pct: f64,
    pub energy_savings_pct: f64,
}

fn prb_stats(prb: &[PrbRecord]) -> (f64, u64) {
    if prb.is_empty() {
        return (0.0, 0);
    }
    let total: u64 = prb.iter().map(|r| r.allocated_prbs).sum();
    let max = prb.iter().map(|r| r.allocated_prbs).max().unwrap_or(0);
    (total as f64 / prb.len() as f64, max)
}

/// Builds the result row for a finished run.
pub fn extract_metrics(
    state: &WorldState,
    param_set: &ParameterSet,
    report: &ComparisonReport,
    prb: &[PrbRecord],
) -> SimulationResult {
    let params = state.params();
    let (mean_allocated_prbs, max_allocated_prbs) = prb_stats(prb);

    SimulationResult {
        experiment_id: param_set.experiment_id.clone(),
        run_id: param_set.run_id,
        seed: param_set.seed,
        cells: state.cells().len(),
        terminals: state.terminals().len(),
        bandwidth: params.bandwidth,
        dynamic_allocation: params.dynamic_allocation,
        look_back: params.prb.look_back,
        look_forward: params.prb.look_forward,
        ticks: report.ticks,
        handovers: state.handover_log().len(),
        prb_events: prb.len(),
        mean_allocated_prbs,
        max_allocated_prbs,
        dynamic_latency: report.dynamic.latency,
        dynamic_packet_loss: report.dynamic.packet_loss,
        dynamic_throughput: report.dynamic.throughput,
        dynamic_energy: report.dynamic.energy,
        regular_latency: report.regular.latency,
        regular_packet_loss: report.regular.packet_loss,
        regular_throughput: report.regular.throughput,
        regular_energy: report.regular.energy,
        latency_reduction_pct: report.latency_reduction_pct,
        packet_loss_reduction_pct: report.packet_loss_reduction_pct,
        throughput_increase_pct: report.throughput_increase_pct,
        energy_savings_pct: report.energy_savings_pct,
    }
}

/// Short label of the layout, used in logs.
pub fn layout_label(param_set: &ParameterSet) -> String {
    let cells = match &param_set.params.cells {
        CellLayout::Random { count, .. } => format!("{count} random cells"),
        CellLayout::Fixed(cells) => format!("{} fixed cells", cells.len()),
    };
    let terminals = match &param_set.params.terminals {
        TerminalLayout::PerCell { per_cell, .. } => format!("{per_cell} terminals/cell"),
        TerminalLayout::Fixed(terminals) => format!("{} fixed terminals", terminals.len()),
    };
    format!("{cells}, {terminals}")
}
