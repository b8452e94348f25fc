use bevy_ecs::prelude::Query;

use crate::ecs::ServingLink;

/// Handover flags live for one tick; the link views have consumed them.
pub fn clear_handover_flags_system(mut links: Query<&mut ServingLink>) {
    for mut link in &mut links {
        if link.handover_occurred {
            link.handover_occurred = false;
        }
    }
}
