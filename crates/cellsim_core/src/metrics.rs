//! Per-tick link KPIs (latency, packet loss, energy) and the running totals
//! used to compare the dynamic and regular policies at the end of a run.

use bevy_ecs::prelude::Resource;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::scenario::MetricsConfig;

const SPEED_OF_LIGHT_M_S: f64 = 3e8;
const PACKET_SIZE_BITS: f64 = 1500.0 * 8.0;
const GOOD_SINR_DB: f64 = 20.0;
const BAD_SINR_DB: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Policy {
    Dynamic,
    Regular,
}

impl Policy {
    pub fn is_dynamic(self) -> bool {
        self == Policy::Dynamic
    }

    pub fn label(self) -> &'static str {
        match self {
            Policy::Dynamic => "Dynamic",
            Policy::Regular => "Regular",
        }
    }
}

/// KPIs of one terminal under one policy at one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyMetrics {
    pub sinr_db: f64,
    pub throughput: f64,
    pub latency: f64,
    pub packet_loss: f64,
    pub energy: f64,
}

/// Propagation plus transmission delay of one 1500-byte packet.
///
/// Regular mode transmits over a fixed bandwidth; dynamic mode over the
/// nominal bandwidth plus a random jitter.
pub fn latency<R: Rng>(
    distance_m: f64,
    nominal_bandwidth: f64,
    policy: Policy,
    config: &MetricsConfig,
    rng: &mut R,
) -> f64 {
    let bandwidth = match policy {
        Policy::Regular => config.regular_latency_bandwidth,
        Policy::Dynamic => {
            nominal_bandwidth + rng.gen_range(config.latency_jitter_min..config.latency_jitter_max)
        }
    };
    distance_m / SPEED_OF_LIGHT_M_S + PACKET_SIZE_BITS / bandwidth
}

pub fn packet_loss<R: Rng>(sinr_db: f64, policy: Policy, rng: &mut R) -> f64 {
    if sinr_db >= GOOD_SINR_DB {
        return 0.0;
    }
    let bad = sinr_db < BAD_SINR_DB;
    match (policy, bad) {
        (Policy::Regular, true) => 2.0,
        (Policy::Regular, false) => 1.0,
        (Policy::Dynamic, true) => rng.gen_range(2.0..4.0),
        (Policy::Dynamic, false) => rng.gen_range(1.0..2.0),
    }
}

pub fn energy(throughput: f64, config: &MetricsConfig) -> f64 {
    config.energy_per_throughput * throughput
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyTotals {
    pub latency: f64,
    pub packet_loss: f64,
    pub throughput: f64,
    pub energy: f64,
    pub samples: u64,
}

impl PolicyTotals {
    pub fn add(&mut self, metrics: &PolicyMetrics) {
        self.latency += metrics.latency;
        self.packet_loss += metrics.packet_loss;
        self.throughput += metrics.throughput;
        self.energy += metrics.energy;
        self.samples += 1;
    }

    /// Totals divided by the number of ticks in the run.
    pub fn per_tick(&self, ticks: u64) -> PolicyTotals {
        if ticks == 0 {
            return PolicyTotals::default();
        }
        let n = ticks as f64;
        PolicyTotals {
            latency: self.latency / n,
            packet_loss: self.packet_loss / n,
            throughput: self.throughput / n,
            energy: self.energy / n,
            samples: self.samples,
        }
    }
}

/// Running sums per policy for the whole run.
#[derive(Debug, Clone, Default, Resource)]
pub struct PolicyAggregates {
    pub dynamic: PolicyTotals,
    pub regular: PolicyTotals,
}

impl PolicyAggregates {
    pub fn totals_mut(&mut self, policy: Policy) -> &mut PolicyTotals {
        match policy {
            Policy::Dynamic => &mut self.dynamic,
            Policy::Regular => &mut self.regular,
        }
    }

    pub fn report(&self, ticks: u64) -> ComparisonReport {
        ComparisonReport::new(ticks, self.dynamic.per_tick(ticks), self.regular.per_tick(ticks))
    }
}

/// `100 * |dynamic - regular| / regular`, 0 when the regular value is 0.
pub fn percent_difference(dynamic: f64, regular: f64) -> f64 {
    if regular == 0.0 {
        return 0.0;
    }
    100.0 * (dynamic - regular).abs() / regular.abs()
}

/// End-of-run comparison of dynamic against regular.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub ticks: u64,
    pub dynamic: PolicyTotals,
    pub regular: PolicyTotals,
    pub latency_reduction_pct: f64,
    pub packet_loss_reduction_pct: f64,
    pub throughput_increase_pct: f64,
    pub energy_savings_pct: f64,
}

impl ComparisonReport {
    pub fn new(ticks: u64, dynamic: PolicyTotals, regular: PolicyTotals) -> Self {
        Self {
            ticks,
            dynamic,
            regular,
            latency_reduction_pct: percent_difference(dynamic.latency, regular.latency),
            packet_loss_reduction_pct: percent_difference(dynamic.packet_loss, regular.packet_loss),
            throughput_increase_pct: percent_difference(dynamic.throughput, regular.throughput),
            energy_savings_pct: percent_difference(dynamic.energy, regular.energy),
        }
    }
}

impl std::fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Latency Reduction: {:.3}% Packet Loss Reduction: {:.3}% Throughput Increase: {:.3}% Energy Savings: {:.3}%",
            self.latency_reduction_pct,
            self.packet_loss_reduction_pct,
            self.throughput_increase_pct,
            self.energy_savings_pct
        )
    }
}
