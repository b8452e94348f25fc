//! Result export: append-mode CSV record logs plus CSV, JSON and Parquet
//! exports of sweep results and tick snapshots.

use std::path::Path;

use cellsim_core::TickResult;
use serde::Serialize;

use crate::metrics::SimulationResult;

#[path = "export/csv.rs"]
mod csv;
#[path = "export/json.rs"]
mod json;
#[path = "export/parquet.rs"]
mod parquet;
#[path = "export/writer_utils.rs"]
mod writer_utils;

pub use self::csv::{CsvRecordSink, METRICS_LOG, PRB_LOG};

/// Export sweep results to Parquet, one row per run.
///
/// # Errors
///
/// Returns an error if `results` is empty, or if file creation or Parquet
/// writing fails.
pub fn export_to_parquet(
    results: &[SimulationResult],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    writer_utils::ensure_not_empty(results)?;
    let file = writer_utils::create_output_file(path)?;
    parquet::export_to_parquet_impl(results, file)
}

/// Export tick snapshots to Parquet, one row per terminal per tick.
pub fn export_ticks_to_parquet(
    ticks: &[TickResult],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    writer_utils::ensure_not_empty(ticks)?;
    let file = writer_utils::create_output_file(path)?;
    parquet::export_ticks_to_parquet_impl(ticks, file)
}

/// Export sweep results as a pretty-printed JSON array.
pub fn export_to_json(
    results: &[SimulationResult],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = writer_utils::create_output_file(path)?;
    json::export_to_json_impl(results, file)
}

/// Export any serializable report (a comparison report, a full run) as
/// pretty-printed JSON.
pub fn export_report_to_json<T: Serialize + ?Sized>(
    report: &T,
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = writer_utils::create_output_file(path)?;
    json::export_to_json_impl(report, file)
}

/// Export sweep results to CSV with one column per parameter and metric.
///
/// # Errors
///
/// Returns an error if `results` is empty, or if file creation or CSV
/// writing fails.
pub fn export_to_csv(
    results: &[SimulationResult],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    writer_utils::ensure_not_empty(results)?;
    let file = writer_utils::create_output_file(path)?;
    csv::export_to_csv_impl(results, file)
}
