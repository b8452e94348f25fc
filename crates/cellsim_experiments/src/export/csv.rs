use std::fs::File;
use std::path::{Path, PathBuf};

use cellsim_core::error::SinkError;
use cellsim_core::sink::{MetricsRecord, PrbRecord, RecordSink, SimRecord};
use tracing::debug;

use super::writer_utils;
use crate::metrics::SimulationResult;

/// Per-tick metrics log, one row per terminal, policy and tick.
pub const METRICS_LOG: &str = "out_log.csv";
/// PRB log, one row per handover that produced a requirement.
pub const PRB_LOG: &str = "out_prb.csv";

const METRICS_HEADER: [&str; 8] = [
    "Index",
    "Policy",
    "Method",
    "Time",
    "Latency",
    "Packet_Loss",
    "Throughput",
    "Energy_Consumption",
];

const PRB_HEADER: [&str; 5] = ["Index", "Time", "PRB", "Required_PRB", "Target_Throughput"];

fn backend(err: csv::Error) -> SinkError {
    SinkError::Backend(err.to_string())
}

/// One append-only CSV table. The header is written only into an empty
/// file, and a row equal to the table's last row is skipped, including the
/// last row left by an earlier process.
struct AppendLog {
    writer: csv::Writer<File>,
    last_row: Option<Vec<String>>,
}

impl AppendLog {
    fn open(path: &Path, header: &[&str]) -> Result<Self, SinkError> {
        let last_row = read_last_row(path)?;
        let (file, is_new) = writer_utils::open_append(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(header).map_err(backend)?;
        }
        Ok(Self { writer, last_row })
    }

    fn append(&mut self, row: Vec<String>) -> Result<bool, SinkError> {
        if self.last_row.as_ref() == Some(&row) {
            return Ok(false);
        }
        self.writer.write_record(&row).map_err(backend)?;
        self.last_row = Some(row);
        Ok(true)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(self.writer.flush()?)
    }
}

fn read_last_row(path: &Path) -> Result<Option<Vec<String>>, SinkError> {
    if !path.exists() {
        return Ok(None);
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(backend)?;
    let mut last = None;
    for record in reader.records() {
        let record = record.map_err(backend)?;
        last = Some(record.iter().map(str::to_owned).collect());
    }
    Ok(last)
}

fn metrics_row(record: &MetricsRecord) -> Vec<String> {
    let method = if record.handover { "Dynamic" } else { "Normal" };
    vec![
        record.terminal.to_string(),
        record.policy.label().to_string(),
        method.to_string(),
        record.tick.to_string(),
        record.latency.to_string(),
        record.packet_loss.to_string(),
        record.throughput.to_string(),
        record.energy.to_string(),
    ]
}

fn prb_row(record: &PrbRecord) -> Vec<String> {
    vec![
        record.terminal.to_string(),
        record.tick.to_string(),
        record.allocated_prbs.to_string(),
        record.required_prbs.to_string(),
        record.target_throughput.to_string(),
    ]
}

/// Record sink writing the metrics and PRB logs into a directory.
///
/// `Method` is `Dynamic` on ticks where the terminal handed over and
/// `Normal` otherwise; `Policy` names the view that produced the row.
pub struct CsvRecordSink {
    metrics: AppendLog,
    prb: AppendLog,
    dir: PathBuf,
}

impl CsvRecordSink {
    /// Opens (or creates) `out_log.csv` and `out_prb.csv` under `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SinkError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let metrics = AppendLog::open(&dir.join(METRICS_LOG), &METRICS_HEADER)?;
        let prb = AppendLog::open(&dir.join(PRB_LOG), &PRB_HEADER)?;
        debug!(dir = %dir.display(), "csv record sink opened");
        Ok(Self { metrics, prb, dir })
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.dir.join(METRICS_LOG)
    }

    pub fn prb_path(&self) -> PathBuf {
        self.dir.join(PRB_LOG)
    }
}

impl RecordSink for CsvRecordSink {
    fn record(&mut self, record: &SimRecord) -> Result<(), SinkError> {
        match record {
            SimRecord::Metrics(m) => self.metrics.append(metrics_row(m))?,
            SimRecord::Prb(p) => self.prb.append(prb_row(p))?,
        };
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.metrics.flush()?;
        self.prb.flush()
    }
}

pub(crate) fn export_to_csv_impl(
    results: &[SimulationResult],
    file: File,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_writer(file);

    wtr.write_record([
        "experiment_id",
        "run_id",
        "seed",
        "cells",
        "terminals",
        "bandwidth",
        "dynamic_allocation",
        "look_back",
        "look_forward",
        "ticks",
        "handovers",
        "prb_events",
        "mean_allocated_prbs",
        "max_allocated_prbs",
        "dynamic_latency",
        "dynamic_packet_loss",
        "dynamic_throughput",
        "dynamic_energy",
        "regular_latency",
        "regular_packet_loss",
        "regular_throughput",
        "regular_energy",
        "latency_reduction_pct",
        "packet_loss_reduction_pct",
        "throughput_increase_pct",
        "energy_savings_pct",
    ])?;

    for result in results {
        wtr.write_record([
            &result.experiment_id,
            &result.run_id.to_string(),
            &result.seed.to_string(),
            &result.cells.to_string(),
            &result.terminals.to_string(),
            &result.bandwidth.to_string(),
            &result.dynamic_allocation.to_string(),
            &result.look_back.to_string(),
            &result.look_forward.to_string(),
            &result.ticks.to_string(),
            &result.handovers.to_string(),
            &result.prb_events.to_string(),
            &result.mean_allocated_prbs.to_string(),
            &result.max_allocated_prbs.to_string(),
            &result.dynamic_latency.to_string(),
            &result.dynamic_packet_loss.to_string(),
            &result.dynamic_throughput.to_string(),
            &result.dynamic_energy.to_string(),
            &result.regular_latency.to_string(),
            &result.regular_packet_loss.to_string(),
            &result.regular_throughput.to_string(),
            &result.regular_energy.to_string(),
            &result.latency_reduction_pct.to_string(),
            &result.packet_loss_reduction_pct.to_string(),
            &result.throughput_increase_pct.to_string(),
            &result.energy_savings_pct.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
