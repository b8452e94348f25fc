//! Dynamic PRB compensation around handovers.
//!
//! Each terminal keeps one [`ThroughputSeries`] per policy. When a handover
//! is flagged at tick `T` the series is rewritten in two windows:
//!
//! - look-back `[T - look_back, T)`: samples under the target throughput are
//!   lifted by the extra PRBs a predictive scheduler would have granted. The
//!   credited delta is remembered per tick and taken back out once the tick
//!   falls before a later look-back window.
//! - look-forward `(T, T + look_forward]`: the handover outage, every sample
//!   in it is zero.
//!
//! The target is the midpoint of the running minimum and maximum of the
//! whole series. Those trackers are never reset. Windows of handovers closer
//! than their combined width overlap; the later handover simply overwrites.

use std::collections::BTreeMap;

use crate::scenario::PrbConfig;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    pub throughput: f64,
    /// Compensation credited to this tick and not yet taken back.
    pub delta: f64,
}

/// Resource blocks needed to hold the target throughput after a handover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrbRequirement {
    pub tick: u64,
    pub target_throughput: f64,
    pub required_prbs: u64,
    pub allocated_prbs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CompensationOutcome {
    pub requirement: Option<PrbRequirement>,
    /// Number of look-back samples that received a delta.
    pub compensated_samples: usize,
}

#[derive(Debug, Clone)]
pub struct ThroughputSeries {
    samples: BTreeMap<u64, Sample>,
    running_min: f64,
    running_max: f64,
    /// Exclusive start, inclusive end.
    outage: Option<(u64, u64)>,
}

impl Default for ThroughputSeries {
    fn default() -> Self {
        Self {
            samples: BTreeMap::new(),
            running_min: f64::INFINITY,
            running_max: 0.0,
            outage: None,
        }
    }
}

impl ThroughputSeries {
    pub fn running_min(&self) -> f64 {
        self.running_min
    }

    pub fn running_max(&self) -> f64 {
        self.running_max
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, tick: u64) -> Option<f64> {
        self.samples.get(&tick).map(|s| s.throughput)
    }

    pub fn delta(&self, tick: u64) -> Option<f64> {
        self.samples.get(&tick).map(|s| s.delta)
    }

    pub fn samples(&self) -> impl Iterator<Item = (u64, f64)> + '_ {
        self.samples.iter().map(|(t, s)| (*t, s.throughput))
    }

    pub fn in_outage(&self, tick: u64) -> bool {
        self.outage
            .is_some_and(|(start, end)| tick > start && tick <= end)
    }

    /// Stores the sample for `tick` and returns the stored value, which is 0
    /// inside an active outage window.
    pub fn record(&mut self, tick: u64, throughput: f64) -> f64 {
        let stored = if self.in_outage(tick) { 0.0 } else { throughput };
        self.samples.insert(
            tick,
            Sample {
                throughput: stored,
                delta: 0.0,
            },
        );
        self.observe_extrema(stored);
        stored
    }

    fn observe_extrema(&mut self, value: f64) {
        if value < self.running_min {
            self.running_min = value;
        }
        if value > self.running_max {
            self.running_max = value;
        }
    }

    /// Midpoint of the running extrema; 0 before any sample was recorded.
    pub fn target_throughput(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        (self.running_min + self.running_max) / 2.0
    }

    /// Rewrites the series around a handover at `tick`. `compensate` enables
    /// the look-back credit; the outage window applies either way.
    pub fn on_handover(
        &mut self,
        tick: u64,
        sinr_linear: f64,
        compensate: bool,
        config: &PrbConfig,
    ) -> CompensationOutcome {
        let target = self.target_throughput();
        let required_prbs = (target / config.prb_bandwidth_unit).ceil().max(0.0) as u64;
        let requirement = (required_prbs > 0).then_some(PrbRequirement {
            tick,
            target_throughput: target,
            required_prbs,
            allocated_prbs: config.baseline_prbs + required_prbs,
        });

        let mut compensated_samples = 0;
        if compensate && tick > config.look_back {
            let start = tick - config.look_back;
            compensated_samples = self.credit_look_back(start, tick, target, sinr_linear, config);
            self.revoke_before(start);
        }

        let end = tick + config.look_forward;
        self.outage = Some((tick, end));
        for (_, sample) in self.samples.range_mut(tick + 1..=end) {
            sample.throughput = 0.0;
            sample.delta = 0.0;
        }

        CompensationOutcome {
            requirement,
            compensated_samples,
        }
    }

    fn credit_look_back(
        &mut self,
        start: u64,
        end: u64,
        target: f64,
        sinr_linear: f64,
        config: &PrbConfig,
    ) -> usize {
        let denominator = config.prb_bandwidth_unit * (1.0 + sinr_linear).log2();
        if !denominator.is_finite() || denominator <= 0.0 {
            return 0;
        }

        let mut credited = 0;
        let mut new_min = self.running_min;
        for (_, sample) in self.samples.range_mut(start..end) {
            if sample.throughput < target {
                let delta = (target - sample.throughput) / denominator;
                sample.delta = delta;
                sample.throughput += delta;
                credited += 1;
                if sample.throughput < new_min {
                    new_min = sample.throughput;
                }
            }
        }
        self.running_min = new_min;
        credited
    }

    fn revoke_before(&mut self, start: u64) {
        for (_, sample) in self.samples.range_mut(1..start) {
            sample.throughput -= sample.delta;
            sample.delta = 0.0;
        }
    }
}
