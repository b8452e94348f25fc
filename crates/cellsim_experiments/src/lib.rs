//! Experiment tooling around `cellsim_core`: persistence sinks, parallel
//! parameter sweeps and result exports.
//!
//! # Quick Start
//!
//! ```no_run
//! use cellsim_experiments::{export_to_csv, run_parallel_experiments, ParameterSpace};
//!
//! // Three cell counts, four seeds each.
//! let space = ParameterSpace::grid()
//!     .cell_counts(vec![3, 5, 8])
//!     .replications(4);
//!
//! let results = run_parallel_experiments(space.generate(), None).unwrap();
//! export_to_csv(&results, "sweep.csv").unwrap();
//! ```
//!
//! # Architecture
//!
//! - [`parameters`]: parameter spaces (grid search, random sampling)
//! - [`runner`]: single runs and rayon-parallel sweeps
//! - [`metrics`]: one flat result row per run
//! - [`export`]: CSV record logs and CSV/JSON/Parquet exports
//! - [`logging`]: `tracing-subscriber` setup for the CLI

pub mod export;
pub mod logging;
pub mod metrics;
pub mod parameters;
pub mod runner;

pub use export::{
    export_report_to_json, export_ticks_to_parquet, export_to_csv, export_to_json,
    export_to_parquet, CsvRecordSink,
};
pub use logging::{init_logging, LogLevel};
pub use metrics::SimulationResult;
pub use parameters::{load_scenario_params, ParameterSet, ParameterSpace};
pub use runner::{run_parallel_experiments, run_single_simulation, SimulationArtifacts};
