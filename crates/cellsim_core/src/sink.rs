//! Record sinks: where per-tick metrics and PRB requirements go.
//!
//! The engine never touches files. It hands every record to the injected
//! [`RecordSink`]; persistence backends live with the callers.

use std::sync::{Arc, Mutex, MutexGuard};

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::ecs::TerminalId;
use crate::error::SinkError;
use crate::metrics::Policy;

/// One row of the per-tick metrics table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub terminal: TerminalId,
    pub policy: Policy,
    pub tick: u64,
    pub handover: bool,
    pub latency: f64,
    pub packet_loss: f64,
    pub throughput: f64,
    pub energy: f64,
}

/// One row of the per-handover PRB table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrbRecord {
    pub terminal: TerminalId,
    pub tick: u64,
    pub target_throughput: f64,
    pub required_prbs: u64,
    pub allocated_prbs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SimRecord {
    Metrics(MetricsRecord),
    Prb(PrbRecord),
}

pub trait RecordSink: Send + Sync {
    fn record(&mut self, record: &SimRecord) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn record(&mut self, _record: &SimRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

/// In-memory sink. Clones share one buffer, so a caller can keep a handle
/// while the world owns the sink.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<SimRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SimRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn records(&self) -> Vec<SimRecord> {
        self.lock().clone()
    }

    pub fn metrics(&self) -> Vec<MetricsRecord> {
        self.lock()
            .iter()
            .filter_map(|r| match r {
                SimRecord::Metrics(m) => Some(*m),
                SimRecord::Prb(_) => None,
            })
            .collect()
    }

    pub fn prb(&self) -> Vec<PrbRecord> {
        self.lock()
            .iter()
            .filter_map(|r| match r {
                SimRecord::Prb(p) => Some(*p),
                SimRecord::Metrics(_) => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl RecordSink for MemorySink {
    fn record(&mut self, record: &SimRecord) -> Result<(), SinkError> {
        self.lock().push(*record);
        Ok(())
    }
}

/// Skips a record identical to the previous record of the same table.
#[derive(Debug)]
pub struct Deduplicated<S> {
    inner: S,
    last_metrics: Option<MetricsRecord>,
    last_prb: Option<PrbRecord>,
}

impl<S: RecordSink> Deduplicated<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            last_metrics: None,
            last_prb: None,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: RecordSink> RecordSink for Deduplicated<S> {
    fn record(&mut self, record: &SimRecord) -> Result<(), SinkError> {
        let duplicate = match record {
            SimRecord::Metrics(m) => self.last_metrics.replace(*m) == Some(*m),
            SimRecord::Prb(p) => self.last_prb.replace(*p) == Some(*p),
        };
        if duplicate {
            return Ok(());
        }
        self.inner.record(record)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.inner.flush()
    }
}

/// The sink the link-view system writes through.
#[derive(Resource)]
pub struct RecordSinkResource(pub Box<dyn RecordSink>);

impl Default for RecordSinkResource {
    fn default() -> Self {
        Self(Box::new(NullSink))
    }
}

impl RecordSinkResource {
    pub fn new(sink: impl RecordSink + 'static) -> Self {
        Self(Box::new(sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(tick: u64, throughput: f64) -> SimRecord {
        SimRecord::Metrics(MetricsRecord {
            terminal: 0,
            policy: Policy::Dynamic,
            tick,
            handover: false,
            latency: 1.0,
            packet_loss: 0.0,
            throughput,
            energy: 0.01 * throughput,
        })
    }

    fn prb(tick: u64) -> SimRecord {
        SimRecord::Prb(PrbRecord {
            terminal: 0,
            tick,
            target_throughput: 50.0,
            required_prbs: 3,
            allocated_prbs: 28,
        })
    }

    #[test]
    fn memory_sink_clones_share_the_buffer() {
        let handle = MemorySink::new();
        let mut sink = handle.clone();
        sink.record(&metrics(1, 10.0)).expect("record");
        sink.record(&prb(1)).expect("record");
        assert_eq!(handle.len(), 2);
        assert_eq!(handle.metrics().len(), 1);
        assert_eq!(handle.prb().len(), 1);
    }

    #[test]
    fn dedup_skips_consecutive_identical_rows_per_table() {
        let mut sink = Deduplicated::new(MemorySink::new());
        sink.record(&metrics(1, 10.0)).expect("record");
        sink.record(&metrics(1, 10.0)).expect("record");
        sink.record(&prb(1)).expect("record");
        // a PRB row in between does not reset the metrics table's last row
        sink.record(&metrics(1, 10.0)).expect("record");
        sink.record(&prb(1)).expect("record");
        sink.record(&metrics(2, 10.0)).expect("record");
        sink.record(&metrics(1, 10.0)).expect("record");
        let handle = sink.into_inner();
        assert_eq!(handle.metrics().len(), 3);
        assert_eq!(handle.prb().len(), 1);
    }
}
