//! Movement system: every terminal takes one step toward its target.

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::trace;

use crate::ecs::{MovementTarget, Position, Terminal};
use crate::mobility::move_terminal;
use crate::scenario::{MobilityConfig, SimRng};

pub fn movement_system(
    config: Res<MobilityConfig>,
    mut rng: ResMut<SimRng>,
    mut terminals: Query<(&Terminal, &mut Position, &mut MovementTarget)>,
) {
    let mut ordered: Vec<_> = terminals.iter_mut().collect();
    ordered.sort_by_key(|(terminal, _, _)| terminal.id);

    let rng = &mut rng.mobility;
    for (terminal, mut position, mut target) in ordered {
        move_terminal(&mut position.0, &mut target.0, &config, rng);
        trace!(terminal = terminal.id, x = position.0.x, y = position.0.y, "moved");
    }
}
