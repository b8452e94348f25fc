//! Handover system: re-evaluates every terminal's serving cell against the
//! moved positions.

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::debug;

use crate::clock::SimulationClock;
use crate::ecs::{Cell, Position, ServingLink, Terminal};
use crate::handover::{evaluate_terminal, HandoverDecision, HandoverEvent};
use crate::scenario::{RadioConfig, SimRng};
use crate::telemetry::HandoverLog;

pub fn handover_system(
    clock: Res<SimulationClock>,
    config: Res<RadioConfig>,
    mut rng: ResMut<SimRng>,
    mut log: ResMut<HandoverLog>,
    cells: Query<&Cell>,
    mut terminals: Query<(&Terminal, &Position, &mut ServingLink)>,
) {
    let mut cells: Vec<&Cell> = cells.iter().collect();
    cells.sort_by_key(|c| c.id);
    let mut ordered: Vec<_> = terminals.iter_mut().collect();
    ordered.sort_by_key(|(terminal, _, _)| terminal.id);

    let tick = clock.now();
    let rng = &mut rng.fading;
    for (terminal, position, mut link) in ordered {
        let decision = evaluate_terminal(terminal, position.0, &mut link, &cells, &config, rng);
        if let HandoverDecision::Handover { from, to } = decision {
            debug!(terminal = terminal.id, from, to, tick, "handover");
            log.push(HandoverEvent {
                terminal: terminal.id,
                from: Some(from),
                to,
                tick,
                forced: false,
            });
        }
    }
}
