//! Serving-cell selection.
//!
//! Every tick each terminal scores all cells: SINR with mean interference
//! (plus a fading draw inside the cell's coverage radius), the throughput the
//! link would carry, and an outage probability for a minimum guaranteed rate.
//! Cells whose outage probability clears the eligibility threshold compete on
//! SINR. The per-terminal state machine is `Unassigned -> Served(cell)`;
//! only a change between two served states counts as a handover.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ecs::{Cell, CellId, Point, ServingLink, Terminal, TerminalId};
use crate::propagation::{self, InterferenceAggregation, Sinr};
use crate::scenario::RadioConfig;
use crate::throughput;

/// Serving-cell transition, raised when a served terminal switches cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandoverEvent {
    pub terminal: TerminalId,
    pub from: Option<CellId>,
    pub to: CellId,
    pub tick: u64,
    /// Switched by an external action rather than by the per-tick evaluation.
    pub forced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateEvaluation {
    pub cell: CellId,
    pub sinr_db: f64,
    pub throughput: f64,
    pub failure_probability: f64,
    pub eligible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoverDecision {
    Unchanged,
    InitialAssignment(CellId),
    Handover { from: CellId, to: CellId },
}

impl HandoverDecision {
    pub fn is_handover(&self) -> bool {
        matches!(self, HandoverDecision::Handover { .. })
    }
}

/// `P_failure = 1 - exp(-gamma_th / lambda * gamma)` where both gammas are
/// the linear SINRs implied by a rate over the nominal `bandwidth`.
pub fn failure_probability(
    min_required_throughput: f64,
    throughput: f64,
    bandwidth: f64,
    lambda: f64,
) -> f64 {
    let gamma_th = 2f64.powf(min_required_throughput / bandwidth) - 1.0;
    let gamma = 2f64.powf(throughput / bandwidth) - 1.0;
    1.0 - (-gamma_th / lambda * gamma).exp()
}

fn fading_loss<R: Rng>(losses: &[f64], rng: &mut R) -> f64 {
    if losses.is_empty() {
        0.0
    } else {
        losses[rng.gen_range(0..losses.len())]
    }
}

/// Scores every cell for `terminal` at `position`. `cells` must be ordered by id.
pub fn evaluate_candidates<R: Rng>(
    terminal: &Terminal,
    position: Point,
    cells: &[&Cell],
    config: &RadioConfig,
    rng: &mut R,
) -> Vec<CandidateEvaluation> {
    cells
        .iter()
        .map(|cell| {
            let mean = propagation::sinr(
                cell,
                cells.iter().copied(),
                position,
                terminal.noise_dbm,
                InterferenceAggregation::Mean,
            );
            let mut sinr_db = mean.db;
            if propagation::distance(cell, position) <= cell.radius {
                sinr_db += fading_loss(&config.fading_losses_db, rng);
            }
            let sinr = Sinr::from_db(sinr_db);
            let throughput = throughput::estimate(
                terminal.bandwidth,
                config.bandwidth_bonus,
                terminal.dynamic_allocation,
                sinr.linear,
            );
            let failure_probability = failure_probability(
                config.min_required_throughput,
                throughput,
                terminal.bandwidth,
                config.outage_decay,
            );
            CandidateEvaluation {
                cell: cell.id,
                sinr_db,
                throughput,
                failure_probability,
                eligible: failure_probability > config.eligibility_threshold,
            }
        })
        .collect()
}

/// Highest-SINR eligible candidate; the earliest wins a tie.
pub fn select_best(candidates: &[CandidateEvaluation]) -> Option<&CandidateEvaluation> {
    let mut best: Option<&CandidateEvaluation> = None;
    for candidate in candidates.iter().filter(|c| c.eligible) {
        if best.map_or(true, |b| candidate.sinr_db > b.sinr_db) {
            best = Some(candidate);
        }
    }
    best
}

/// Applies a selected cell to the serving link and raises the handover flag
/// when a served terminal changes cell.
pub fn apply_selection(link: &mut ServingLink, selected: Option<CellId>) -> HandoverDecision {
    let Some(to) = selected else {
        return HandoverDecision::Unchanged;
    };
    match link.cell {
        Some(from) if from == to => HandoverDecision::Unchanged,
        Some(from) => {
            link.cell = Some(to);
            link.handover_occurred = true;
            HandoverDecision::Handover { from, to }
        }
        None => {
            link.cell = Some(to);
            HandoverDecision::InitialAssignment(to)
        }
    }
}

fn refresh_signal_strength(link: &mut ServingLink, cells: &[&Cell], position: Point) {
    if let Some(serving) = link.cell.and_then(|id| find_cell(cells, id)) {
        link.signal_strength_dbm = propagation::signal_strength(serving, position);
    }
}

/// Full per-tick evaluation for one terminal.
pub fn evaluate_terminal<R: Rng>(
    terminal: &Terminal,
    position: Point,
    link: &mut ServingLink,
    cells: &[&Cell],
    config: &RadioConfig,
    rng: &mut R,
) -> HandoverDecision {
    let candidates = evaluate_candidates(terminal, position, cells, config, rng);
    let best = select_best(&candidates).copied();
    let decision = apply_selection(link, best.map(|c| c.cell));
    refresh_signal_strength(link, cells, position);
    link.throughput = best.map_or(0.0, |c| c.throughput);
    decision
}

/// Cell with the strongest received power at `position`.
pub fn strongest_cell(cells: &[&Cell], position: Point) -> Option<CellId> {
    let mut best: Option<(CellId, f64)> = None;
    for cell in cells {
        let rx = propagation::signal_strength(cell, position);
        if best.map_or(true, |(_, b)| rx > b) {
            best = Some((cell.id, rx));
        }
    }
    best.map(|(id, _)| id)
}

/// Switches to the strongest cell regardless of the eligibility gate.
pub fn force_strongest(link: &mut ServingLink, cells: &[&Cell], position: Point) -> HandoverDecision {
    let Some(to) = strongest_cell(cells, position) else {
        return HandoverDecision::Unchanged;
    };
    if link.cell == Some(to) {
        return HandoverDecision::Unchanged;
    }
    let from = link.cell;
    link.cell = Some(to);
    link.handover_occurred |= from.is_some();
    refresh_signal_strength(link, cells, position);
    match from {
        Some(from) => HandoverDecision::Handover { from, to },
        None => HandoverDecision::InitialAssignment(to),
    }
}

pub fn find_cell<'a>(cells: &[&'a Cell], id: CellId) -> Option<&'a Cell> {
    cells.iter().copied().find(|c| c.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::noise_floor_dbm;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cell(id: u32, x: f64) -> Cell {
        Cell {
            id,
            position: Point::new(x, 0.0),
            tx_power_dbm: 46.0,
            radius: 1000.0,
            obstructions: Vec::new(),
        }
    }

    fn terminal() -> Terminal {
        Terminal {
            id: 0,
            bandwidth: 20.0,
            dynamic_allocation: false,
            noise_dbm: noise_floor_dbm(20.0),
        }
    }

    fn no_fading() -> RadioConfig {
        RadioConfig {
            fading_losses_db: Vec::new(),
            ..RadioConfig::default()
        }
    }

    #[test]
    fn failure_probability_matches_closed_form() {
        let p = failure_probability(10.0, 20.0, 20.0, 0.01);
        let gamma_th = 2f64.powf(0.5) - 1.0;
        let expected = 1.0 - (-gamma_th / 0.01 * 1.0).exp();
        assert!((p - expected).abs() < 1e-12);
    }

    #[test]
    fn zero_throughput_never_passes_the_gate() {
        assert_eq!(failure_probability(10.0, 0.0, 20.0, 0.01), 0.0);
    }

    #[test]
    fn first_assignment_is_silent() {
        let cells = [cell(0, 0.0), cell(1, 2000.0)];
        let refs: Vec<&Cell> = cells.iter().collect();
        let mut link = ServingLink::default();
        let mut rng = StdRng::seed_from_u64(1);
        let decision = evaluate_terminal(
            &terminal(),
            Point::new(500.0, 0.0),
            &mut link,
            &refs,
            &no_fading(),
            &mut rng,
        );
        assert_eq!(decision, HandoverDecision::InitialAssignment(0));
        assert_eq!(link.cell, Some(0));
        assert!(!link.handover_occurred);
        assert!(link.throughput > 0.0);
    }

    #[test]
    fn switching_served_cell_raises_flag() {
        let cells = [cell(0, 0.0), cell(1, 2000.0)];
        let refs: Vec<&Cell> = cells.iter().collect();
        let mut link = ServingLink {
            cell: Some(0),
            ..ServingLink::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let decision = evaluate_terminal(
            &terminal(),
            Point::new(1900.0, 0.0),
            &mut link,
            &refs,
            &no_fading(),
            &mut rng,
        );
        assert_eq!(decision, HandoverDecision::Handover { from: 0, to: 1 });
        assert!(link.handover_occurred);
    }

    #[test]
    fn ties_keep_the_lower_cell_id() {
        let cells = [cell(0, 0.0), cell(1, 2000.0)];
        let refs: Vec<&Cell> = cells.iter().collect();
        let mut rng = StdRng::seed_from_u64(3);
        let candidates = evaluate_candidates(
            &terminal(),
            Point::new(1000.0, 0.0),
            &refs,
            &no_fading(),
            &mut rng,
        );
        assert_eq!(select_best(&candidates).map(|c| c.cell), Some(0));
    }

    #[test]
    fn no_eligible_candidate_leaves_link_unchanged() {
        let cells = [cell(0, 0.0)];
        let refs: Vec<&Cell> = cells.iter().collect();
        let config = RadioConfig {
            eligibility_threshold: 1.0,
            ..no_fading()
        };
        let mut link = ServingLink::default();
        let mut rng = StdRng::seed_from_u64(3);
        let decision = evaluate_terminal(
            &terminal(),
            Point::new(10.0, 0.0),
            &mut link,
            &refs,
            &config,
            &mut rng,
        );
        assert_eq!(decision, HandoverDecision::Unchanged);
        assert_eq!(link.cell, None);
        assert_eq!(link.throughput, 0.0);
    }

    #[test]
    fn fading_applies_only_inside_coverage() {
        let cells = [cell(0, 0.0), cell(1, 3000.0)];
        let refs: Vec<&Cell> = cells.iter().collect();
        let config = RadioConfig {
            fading_losses_db: vec![-3.0],
            ..RadioConfig::default()
        };
        let at = Point::new(500.0, 0.0);
        let mut rng = StdRng::seed_from_u64(5);
        let faded = evaluate_candidates(&terminal(), at, &refs, &config, &mut rng);
        let clean = evaluate_candidates(&terminal(), at, &refs, &no_fading(), &mut rng);
        assert!((faded[0].sinr_db - (clean[0].sinr_db - 3.0)).abs() < 1e-9);
        assert_eq!(faded[1].sinr_db, clean[1].sinr_db);
    }

    #[test]
    fn forced_handover_picks_strongest_cell() {
        let cells = [cell(0, 0.0), cell(1, 2000.0)];
        let refs: Vec<&Cell> = cells.iter().collect();
        let mut link = ServingLink {
            cell: Some(0),
            ..ServingLink::default()
        };
        let decision = force_strongest(&mut link, &refs, Point::new(1800.0, 0.0));
        assert_eq!(decision, HandoverDecision::Handover { from: 0, to: 1 });
        assert!(link.handover_occurred);
        assert_eq!(
            force_strongest(&mut link, &refs, Point::new(1800.0, 0.0)),
            HandoverDecision::Unchanged
        );
    }
}
