pub mod clock;
pub mod compensation;
pub mod ecs;
pub mod error;
pub mod handover;
pub mod metrics;
pub mod mobility;
pub mod propagation;
pub mod runner;
pub mod scenario;
pub mod sink;
pub mod systems;
pub mod telemetry;
pub mod throughput;
pub mod world_state;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use clock::ModePolicy;
pub use error::{ConfigError, SinkError};
pub use metrics::{ComparisonReport, Policy, PolicyMetrics};
pub use scenario::ScenarioParams;
pub use telemetry::{TerminalTick, TickResult};
pub use world_state::WorldState;
