use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use cellsim_core::{Policy, PolicyMetrics, TerminalTick, TickResult};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use crate::metrics::SimulationResult;

fn write_batch(batch: RecordBatch, file: std::fs::File) -> Result<(), Box<dyn std::error::Error>> {
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

pub(crate) fn export_to_parquet_impl(
    results: &[SimulationResult],
    file: std::fs::File,
) -> Result<(), Box<dyn std::error::Error>> {
    let batch = build_results_batch(results)?;
    write_batch(batch, file)
}

pub(crate) fn export_ticks_to_parquet_impl(
    ticks: &[TickResult],
    file: std::fs::File,
) -> Result<(), Box<dyn std::error::Error>> {
    let batch = build_ticks_batch(ticks)?;
    write_batch(batch, file)
}

fn results_schema() -> Schema {
    let mut fields = vec![
        Field::new("experiment_id", DataType::Utf8, false),
        Field::new("run_id", DataType::UInt64, false),
        Field::new("seed", DataType::UInt64, false),
        Field::new("cells", DataType::UInt64, false),
        Field::new("terminals", DataType::UInt64, false),
        Field::new("bandwidth", DataType::Float64, false),
        Field::new("dynamic_allocation", DataType::Boolean, false),
        Field::new("look_back", DataType::UInt64, false),
        Field::new("look_forward", DataType::UInt64, false),
        Field::new("ticks", DataType::UInt64, false),
        Field::new("handovers", DataType::UInt64, false),
        Field::new("prb_events", DataType::UInt64, false),
        Field::new("mean_allocated_prbs", DataType::Float64, false),
        Field::new("max_allocated_prbs", DataType::UInt64, false),
    ];
    for name in [
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
    ] {
        fields.push(Field::new(name, DataType::Float64, false));
    }
    Schema::new(fields)
}

fn u64_column<T>(rows: &[T], value: impl Fn(&T) -> u64) -> ArrayRef {
    Arc::new(UInt64Array::from(rows.iter().map(value).collect::<Vec<_>>()))
}

fn f64_column<T>(rows: &[T], value: impl Fn(&T) -> f64) -> ArrayRef {
    Arc::new(Float64Array::from(rows.iter().map(value).collect::<Vec<_>>()))
}

fn build_results_batch(
    results: &[SimulationResult],
) -> Result<RecordBatch, arrow::error::ArrowError> {
    let arrays: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(
            results
                .iter()
                .map(|r| r.experiment_id.as_str())
                .collect::<Vec<_>>(),
        )),
        u64_column(results, |r| r.run_id as u64),
        u64_column(results, |r| r.seed),
        u64_column(results, |r| r.cells as u64),
        u64_column(results, |r| r.terminals as u64),
        f64_column(results, |r| r.bandwidth),
        Arc::new(BooleanArray::from(
            results
                .iter()
                .map(|r| r.dynamic_allocation)
                .collect::<Vec<_>>(),
        )),
        u64_column(results, |r| r.look_back),
        u64_column(results, |r| r.look_forward),
        u64_column(results, |r| r.ticks),
        u64_column(results, |r| r.handovers as u64),
        u64_column(results, |r| r.prb_events as u64),
        f64_column(results, |r| r.mean_allocated_prbs),
        u64_column(results, |r| r.max_allocated_prbs),
        f64_column(results, |r| r.dynamic_latency),
        f64_column(results, |r| r.dynamic_packet_loss),
        f64_column(results, |r| r.dynamic_throughput),
        f64_column(results, |r| r.dynamic_energy),
        f64_column(results, |r| r.regular_latency),
        f64_column(results, |r| r.regular_packet_loss),
        f64_column(results, |r| r.regular_throughput),
        f64_column(results, |r| r.regular_energy),
        f64_column(results, |r| r.latency_reduction_pct),
        f64_column(results, |r| r.packet_loss_reduction_pct),
        f64_column(results, |r| r.throughput_increase_pct),
        f64_column(results, |r| r.energy_savings_pct),
    ];

    RecordBatch::try_new(Arc::new(results_schema()), arrays)
}

const POLICY_COLUMNS: [&str; 5] = ["sinr_db", "throughput", "latency", "packet_loss", "energy"];

fn policy_value(metrics: &PolicyMetrics, column: &str) -> f64 {
    match column {
        "sinr_db" => metrics.sinr_db,
        "throughput" => metrics.throughput,
        "latency" => metrics.latency,
        "packet_loss" => metrics.packet_loss,
        _ => metrics.energy,
    }
}

fn policy_prefix(policy: Policy) -> &'static str {
    match policy {
        Policy::Dynamic => "dynamic",
        Policy::Regular => "regular",
    }
}

fn ticks_schema() -> Schema {
    let mut fields = vec![
        Field::new("tick", DataType::UInt64, false),
        Field::new("terminal", DataType::UInt64, false),
        Field::new("x", DataType::Float64, false),
        Field::new("y", DataType::Float64, false),
        Field::new("serving_cell", DataType::UInt64, true),
        Field::new("handover", DataType::Boolean, false),
    ];
    for policy in [Policy::Dynamic, Policy::Regular] {
        for column in POLICY_COLUMNS {
            fields.push(Field::new(
                format!("{}_{column}", policy_prefix(policy)),
                DataType::Float64,
                true,
            ));
        }
    }
    Schema::new(fields)
}

/// One row per terminal per tick. Policy columns are null when the view was
/// not evaluated or the terminal was unserved.
fn build_ticks_batch(ticks: &[TickResult]) -> Result<RecordBatch, arrow::error::ArrowError> {
    let rows: Vec<(u64, &TerminalTick)> = ticks
        .iter()
        .flat_map(|t| t.terminals.iter().map(move |terminal| (t.tick, terminal)))
        .collect();

    let mut arrays: Vec<ArrayRef> = vec![
        u64_column(&rows, |(tick, _)| *tick),
        u64_column(&rows, |(_, t)| u64::from(t.terminal_id)),
        f64_column(&rows, |(_, t)| t.position.x),
        f64_column(&rows, |(_, t)| t.position.y),
        Arc::new(UInt64Array::from(
            rows.iter()
                .map(|(_, t)| t.serving_cell.map(u64::from))
                .collect::<Vec<_>>(),
        )),
        Arc::new(BooleanArray::from(
            rows.iter()
                .map(|(_, t)| t.handover_occurred)
                .collect::<Vec<_>>(),
        )),
    ];
    for policy in [Policy::Dynamic, Policy::Regular] {
        for column in POLICY_COLUMNS {
            arrays.push(Arc::new(Float64Array::from(
                rows.iter()
                    .map(|(_, t)| t.metrics(policy).map(|m| policy_value(m, column)))
                    .collect::<Vec<_>>(),
            )));
        }
    }

    RecordBatch::try_new(Arc::new(ticks_schema()), arrays)
}
