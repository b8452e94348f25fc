mod support;

use cellsim_core::compensation::ThroughputSeries;
use cellsim_core::ecs::Point;
use cellsim_core::handover::HandoverDecision;
use cellsim_core::propagation::{self, InterferenceAggregation};
use cellsim_core::test_helpers::{equidistant_world, stationary_world};
use cellsim_core::{ModePolicy, Policy, WorldState};
use support::world::TestWorldBuilder;

/// Ticks until terminal 0 hands over. Returns the handover tick and both
/// series as they stood before that tick.
fn tick_until_handover(state: &mut WorldState) -> (u64, ThroughputSeries, ThroughputSeries) {
    loop {
        let dynamic = state.series(0, Policy::Dynamic).cloned().expect("series");
        let regular = state.series(0, Policy::Regular).cloned().expect("series");
        let result = state.tick(ModePolicy::Both);
        if result.terminals[0].handover_occurred {
            return (result.tick, dynamic, regular);
        }
        assert!(result.tick < state.params().run_length, "no handover");
    }
}

#[test]
fn stationary_terminal_never_hands_over() {
    let mut state = TestWorldBuilder::new()
        .with_parked_terminal(Point::new(500.0, 0.0))
        .with_fading()
        .build();
    let results = state.run(ModePolicy::Both);
    assert_eq!(results.len(), 200);
    for result in &results {
        let terminal = &result.terminals[0];
        assert_eq!(terminal.serving_cell, Some(0));
        assert!(!terminal.handover_occurred);
    }
    assert!(state.handover_log().is_empty());
}

#[test]
fn first_assignment_is_not_a_handover() {
    let mut state = equidistant_world();
    let result = state.tick(ModePolicy::Both);
    let terminal = &result.terminals[0];
    // exact tie between the two cells goes to the lower id
    assert_eq!(terminal.serving_cell, Some(0));
    assert!(!terminal.handover_occurred);
}

#[test]
fn nudge_across_the_midpoint_hands_over_once() {
    let (mut state, sink) = TestWorldBuilder::new()
        .with_parked_terminal(Point::new(1000.0, 0.0))
        .build_with_sink();
    state.tick(ModePolicy::Both);
    assert!(state.relocate_terminal(0, 1001.0, 0.0));

    let result = state.tick(ModePolicy::Both);
    let terminal = &result.terminals[0];
    assert_eq!(result.tick, 2);
    assert_eq!(terminal.serving_cell, Some(1));
    assert!(terminal.handover_occurred);

    let log = state.handover_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].from, Some(0));
    assert_eq!(log[0].to, 1);
    assert_eq!(log[0].tick, 2);
    assert!(!log[0].forced);

    // flag lasts one tick
    let result = state.tick(ModePolicy::Both);
    assert!(!result.terminals[0].handover_occurred);

    // too early for a look-back window; one PRB row, for the dynamic view
    let prb = sink.prb();
    assert_eq!(prb.len(), 1);
    assert_eq!(prb[0].tick, 2);
    assert_eq!(prb[0].allocated_prbs, 25 + prb[0].required_prbs);
    let flagged: Vec<_> = sink.metrics().into_iter().filter(|m| m.handover).collect();
    assert_eq!(flagged.len(), 2);
    assert!(flagged.iter().all(|m| m.tick == 2));
}

#[test]
fn handover_outage_zeroes_the_following_window() {
    let mut state = TestWorldBuilder::new()
        .with_parked_terminal(Point::new(1000.0, 0.0))
        .build();
    state.tick(ModePolicy::Both);
    state.relocate_terminal(0, 1001.0, 0.0);
    for _ in 2..=40 {
        state.tick(ModePolicy::Both);
    }

    for policy in [Policy::Dynamic, Policy::Regular] {
        let series = state.series(0, policy).expect("series");
        assert!(series.get(1).unwrap_or_default() > 0.0);
        assert!(series.get(2).unwrap_or_default() > 0.0);
        for tick in 3..=32 {
            assert_eq!(series.get(tick), Some(0.0), "{policy:?} tick {tick}");
        }
        assert!(series.get(33).unwrap_or_default() > 0.0);
        assert_eq!(series.running_min(), 0.0);
    }
}

#[test]
fn walking_terminal_switches_to_the_nearer_cell() {
    let mut state = TestWorldBuilder::new()
        .with_walking_terminal(Point::new(990.0, 0.0), Point::new(1010.0, 0.0))
        .build();
    let results = state.run(ModePolicy::Both);
    let handovers: usize = results.iter().map(|r| r.handovers()).sum();
    assert_eq!(handovers, 1);
    let last = results.last().expect("ticks");
    assert_eq!(last.terminals[0].serving_cell, Some(1));
    assert_eq!(last.terminals[0].position, Point::new(1010.0, 0.0));
}

#[test]
fn forced_handover_targets_strongest_cell() {
    let mut state = stationary_world();
    state.tick(ModePolicy::Both);
    // already on the strongest cell
    let decision = state.force_handover(0).expect("terminal");
    assert!(!decision.is_handover());
    assert_eq!(decision, HandoverDecision::Unchanged);
    assert!(state.handover_log().is_empty());
}

#[test]
fn late_handover_lifts_only_the_dynamic_look_back_window() {
    let mut state = TestWorldBuilder::new()
        .with_walking_terminal(Point::new(960.0, 0.0), Point::new(1040.0, 0.0))
        .build();
    let (handover, dynamic_before, regular_before) = tick_until_handover(&mut state);
    let prb = state.params().prb;
    assert!(handover > prb.look_back, "handover at tick {handover}");
    let start = handover - prb.look_back;

    let dynamic = state.series(0, Policy::Dynamic).expect("series");
    let mut lifted = 0;
    for (tick, old) in dynamic_before.samples() {
        let new = dynamic.get(tick).expect("sample");
        let delta = dynamic.delta(tick).expect("delta");
        if tick < start {
            assert_eq!(new, old, "tick {tick} is outside the window");
            assert_eq!(delta, 0.0);
            continue;
        }
        assert!(new >= old, "tick {tick}: {new} < {old}");
        assert!((new - old - delta).abs() < 1e-9, "tick {tick}");
        if delta > 0.0 {
            lifted += 1;
        }
    }
    assert!(lifted > 0);

    let regular = state.series(0, Policy::Regular).expect("series");
    for (tick, old) in regular_before.samples() {
        assert_eq!(regular.get(tick), Some(old), "regular tick {tick}");
        assert_eq!(regular.delta(tick), Some(0.0));
    }

    for _ in 0..prb.look_forward {
        state.tick(ModePolicy::Both);
    }
    assert_eq!(state.handover_log().len(), 1);
    for policy in [Policy::Dynamic, Policy::Regular] {
        let series = state.series(0, policy).expect("series");
        assert!(series.get(handover).unwrap_or_default() > 0.0);
        for tick in handover + 1..=handover + prb.look_forward {
            assert_eq!(series.get(tick), Some(0.0), "{policy:?} tick {tick}");
        }
    }
}

#[test]
fn look_back_credit_uses_the_summed_interference_sinr() {
    let (mut state, sink) = TestWorldBuilder::new()
        .with_cells([
            Point::new(0.0, 0.0),
            Point::new(2000.0, 0.0),
            Point::new(1000.0, 3000.0),
        ])
        .with_walking_terminal(Point::new(960.0, 0.0), Point::new(1040.0, 0.0))
        .build_with_sink();
    let (handover, before, _) = tick_until_handover(&mut state);
    let requirement = sink.prb().last().copied().expect("prb record");
    assert_eq!(requirement.tick, handover);

    let snapshot = state.terminal(0).expect("terminal");
    let cells = state.cells();
    let serving = cells
        .iter()
        .copied()
        .find(|cell| Some(cell.id) == snapshot.serving_cell)
        .expect("serving cell");
    let noise = propagation::noise_floor_dbm(state.params().bandwidth);
    let unit = state.params().prb.prb_bandwidth_unit;
    let denominator = |aggregation: InterferenceAggregation| {
        let sinr = propagation::sinr(
            serving,
            cells.iter().copied(),
            snapshot.position,
            noise,
            aggregation,
        );
        unit * (1.0 + sinr.linear).log2()
    };

    let tick = handover - 1;
    let gap = requirement.target_throughput - before.get(tick).expect("sample");
    assert!(gap > 0.0);
    let delta = state
        .series(0, Policy::Dynamic)
        .and_then(|series| series.delta(tick))
        .expect("delta");
    let summed = gap / denominator(InterferenceAggregation::Sum);
    let mean = gap / denominator(InterferenceAggregation::Mean);
    assert!((delta - summed).abs() < 1e-9, "{delta} vs {summed}");
    assert!((delta - mean).abs() > 1e-3, "{delta} matches the mean SINR");
}

#[test]
fn dynamic_allocation_changes_candidate_throughput_only() {
    let mut regular = TestWorldBuilder::new()
        .with_parked_terminal(Point::new(500.0, 0.0))
        .build();
    let mut dynamic = TestWorldBuilder::new()
        .with_parked_terminal(Point::new(500.0, 0.0))
        .with_dynamic_allocation()
        .build();
    regular.tick(ModePolicy::Both);
    dynamic.tick(ModePolicy::Both);
    let r = regular.terminal(0).expect("terminal");
    let d = dynamic.terminal(0).expect("terminal");
    assert_eq!(r.serving_cell, d.serving_cell);
    assert!((d.throughput / r.throughput - 1.5).abs() < 1e-9);
}
