//! Decision metrics for engine observability

use parking_lot::RwLock;
use serde::Serialize;
use std::time::Duration;

use super::decision::{DenyReason, Verdict};

/// Engine performance metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineMetrics {
    /// Total number of permission checks
    pub total_checks: u64,

    /// Number of allowed verdicts
    pub allowed: u64,

    /// Number of denied verdicts
    pub denied: u64,

    /// Denials caused by the deny store
    pub explicit_denials: u64,

    /// Verdicts served from the cache
    pub cache_hits: u64,

    /// Latency percentiles (microseconds)
    pub latency_p50_us: f64,
    pub latency_p99_us: f64,

    /// Average latency (microseconds)
    pub avg_latency_us: f64,
}

impl EngineMetrics {
    /// Fraction of checks that were allowed
    pub fn allow_rate(&self) -> f64 {
        if self.total_checks == 0 {
            0.0
        } else {
            self.allowed as f64 / self.total_checks as f64
        }
    }
}

/// Metrics collector with a bounded latency sample window
pub struct MetricsCollector {
    metrics: RwLock<EngineMetrics>,

    /// Recent latency samples in microseconds
    latency_samples: RwLock<Vec<f64>>,

    /// Maximum samples to keep
    max_samples: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::with_max_samples(10_000)
    }

    pub fn with_max_samples(max_samples: usize) -> Self {
        Self {
            metrics: RwLock::new(EngineMetrics::default()),
            latency_samples: RwLock::new(Vec::with_capacity(max_samples.min(10_000))),
            max_samples: max_samples.max(1),
        }
    }

    /// Record one finished check
    pub fn record(&self, verdict: &Verdict, cached: bool, latency: Duration) {
        {
            let mut metrics = self.metrics.write();
            metrics.total_checks += 1;

            if verdict.allowed {
                metrics.allowed += 1;
            } else {
                metrics.denied += 1;
            }
            if verdict.reason == Some(DenyReason::ExplicitlyDenied) {
                metrics.explicit_denials += 1;
            }
            if cached {
                metrics.cache_hits += 1;
            }
        }

        let mut samples = self.latency_samples.write();
        samples.push(latency.as_secs_f64() * 1_000_000.0);

        // Keep only recent samples
        if samples.len() > self.max_samples {
            let excess = samples.len() - self.max_samples;
            samples.drain(0..excess);
        }
    }

    /// Current metrics snapshot with latency statistics computed from the window
    pub fn snapshot(&self) -> EngineMetrics {
        let mut metrics = self.metrics.read().clone();
        let samples = self.latency_samples.read();

        if !samples.is_empty() {
            let sum: f64 = samples.iter().sum();
            metrics.avg_latency_us = sum / samples.len() as f64;

            let mut sorted = samples.clone();
            sorted.sort_by(|a, b| a.total_cmp(b));
            metrics.latency_p50_us = percentile(&sorted, 0.50);
            metrics.latency_p99_us = percentile(&sorted, 0.99);
        }

        metrics
    }

    pub fn reset(&self) {
        *self.metrics.write() = EngineMetrics::default();
        self.latency_samples.write().clear();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentile from sorted data
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let idx = ((sorted.len() as f64) * p) as usize;
    sorted[idx.min(sorted.len() - 1)]
}
