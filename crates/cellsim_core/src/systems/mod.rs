//! Tick pipeline systems, in schedule order: movement, handover evaluation,
//! link views, housekeeping.

pub mod handover;
pub mod housekeeping;
pub mod link_views;
pub mod movement;
