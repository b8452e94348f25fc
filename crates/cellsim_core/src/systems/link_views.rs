//! Link views: the dynamic and regular evaluations of every terminal's
//! current link.
//!
//! Both views read the same moved positions and serving cells. Each appends
//! a throughput sample to its own series, derives the tick's KPIs, emits a
//! metrics record and, when the handover flag is up, rewrites its series
//! around the handover. Unserved terminals record a zero sample and report no
//! KPIs.
//!
//! Samples and the look-back credit use the summed-interference SINR; the
//! reported SINR and packet loss use the mean-interference one.

use bevy_ecs::prelude::{Query, Res, ResMut};
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::clock::{ModePolicy, SimulationClock};
use crate::ecs::{Cell, PolicySeries, Position, ServingLink, Terminal};
use crate::handover::find_cell;
use crate::metrics::{self, Policy, PolicyAggregates, PolicyMetrics};
use crate::propagation::{self, InterferenceAggregation};
use crate::scenario::{MetricsConfig, PrbConfig, RadioConfig, SimRng};
use crate::sink::{MetricsRecord, PrbRecord, RecordSink, RecordSinkResource, SimRecord};
use crate::telemetry::{TerminalTick, TickReports};
use crate::throughput;

struct ViewContext<'a> {
    tick: u64,
    cells: &'a [&'a Cell],
    radio: &'a RadioConfig,
    prb: &'a PrbConfig,
    metrics: &'a MetricsConfig,
}

fn emit(sink: &mut dyn RecordSink, record: SimRecord) {
    if let Err(err) = sink.record(&record) {
        warn!(error = %err, "record sink failed");
    }
}

/// Evaluates one policy view of one terminal. Returns `None` when the
/// terminal has no serving cell.
#[allow(clippy::too_many_arguments)]
fn evaluate_view(
    ctx: &ViewContext<'_>,
    policy: Policy,
    terminal: &Terminal,
    position: &Position,
    link: &ServingLink,
    series: &mut PolicySeries,
    rng: &mut StdRng,
    sink: &mut dyn RecordSink,
) -> Option<PolicyMetrics> {
    let series = series.get_mut(policy);
    let Some(serving) = link.cell.and_then(|id| find_cell(ctx.cells, id)) else {
        series.record(ctx.tick, 0.0);
        return None;
    };

    let position = position.0;
    let summed = propagation::sinr(
        serving,
        ctx.cells.iter().copied(),
        position,
        terminal.noise_dbm,
        InterferenceAggregation::Sum,
    );
    let sample = throughput::estimate(
        terminal.bandwidth,
        ctx.radio.bandwidth_bonus,
        policy.is_dynamic(),
        summed.linear,
    );
    let stored = series.record(ctx.tick, sample);

    let reported = propagation::sinr(
        serving,
        ctx.cells.iter().copied(),
        position,
        terminal.noise_dbm,
        InterferenceAggregation::Mean,
    );
    let distance = propagation::distance(serving, position);
    let kpis = PolicyMetrics {
        sinr_db: reported.db,
        throughput: stored,
        latency: metrics::latency(distance, terminal.bandwidth, policy, ctx.metrics, rng),
        packet_loss: metrics::packet_loss(reported.db, policy, rng),
        energy: metrics::energy(stored, ctx.metrics),
    };
    emit(
        sink,
        SimRecord::Metrics(MetricsRecord {
            terminal: terminal.id,
            policy,
            tick: ctx.tick,
            handover: link.handover_occurred,
            latency: kpis.latency,
            packet_loss: kpis.packet_loss,
            throughput: kpis.throughput,
            energy: kpis.energy,
        }),
    );

    if link.handover_occurred {
        let outcome = series.on_handover(ctx.tick, summed.linear, policy.is_dynamic(), ctx.prb);
        if let (Policy::Dynamic, Some(requirement)) = (policy, outcome.requirement) {
            debug!(
                terminal = terminal.id,
                tick = ctx.tick,
                target = requirement.target_throughput,
                required = requirement.required_prbs,
                compensated = outcome.compensated_samples,
                "prb requirement"
            );
            emit(
                sink,
                SimRecord::Prb(PrbRecord {
                    terminal: terminal.id,
                    tick: ctx.tick,
                    target_throughput: requirement.target_throughput,
                    required_prbs: requirement.required_prbs,
                    allocated_prbs: requirement.allocated_prbs,
                }),
            );
        }
    }
    Some(kpis)
}

#[allow(clippy::too_many_arguments)]
pub fn link_views_system(
    clock: Res<SimulationClock>,
    mode: Res<ModePolicy>,
    radio: Res<RadioConfig>,
    prb: Res<PrbConfig>,
    metrics_config: Res<MetricsConfig>,
    mut rng: ResMut<SimRng>,
    mut aggregates: ResMut<PolicyAggregates>,
    mut sink: ResMut<RecordSinkResource>,
    mut reports: ResMut<TickReports>,
    cells: Query<&Cell>,
    mut terminals: Query<(&Terminal, &Position, &ServingLink, &mut PolicySeries)>,
) {
    let mut cells: Vec<&Cell> = cells.iter().collect();
    cells.sort_by_key(|c| c.id);
    let ctx = ViewContext {
        tick: clock.now(),
        cells: &cells,
        radio: &radio,
        prb: &prb,
        metrics: &metrics_config,
    };

    let mut ordered: Vec<_> = terminals.iter_mut().collect();
    ordered.sort_by_key(|(terminal, _, _, _)| terminal.id);

    let rng = &mut rng.metrics;
    let sink = sink.0.as_mut();
    for (terminal, position, link, mut series) in ordered {
        let mut view = |policy: Policy| {
            let kpis = evaluate_view(&ctx, policy, terminal, position, link, &mut series, rng, sink);
            if let Some(kpis) = &kpis {
                aggregates.totals_mut(policy).add(kpis);
            }
            kpis
        };
        let dynamic = if mode.includes_dynamic() {
            view(Policy::Dynamic)
        } else {
            None
        };
        let regular = if mode.includes_regular() {
            view(Policy::Regular)
        } else {
            None
        };
        reports.terminals.push(TerminalTick {
            terminal_id: terminal.id,
            position: position.0,
            serving_cell: link.cell,
            handover_occurred: link.handover_occurred,
            dynamic,
            regular,
        });
    }
}
