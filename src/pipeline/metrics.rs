// src/pipeline/metrics.rs
//
// Tick-level counters and detector latency. Shared handles so the goal
// consumer or a status task can read them while the driver runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct ControllerMetrics {
    pub ticks: Arc<AtomicU64>,
    pub ticks_waiting: Arc<AtomicU64>,
    pub ticks_failed: Arc<AtomicU64>,
    pub overruns: Arc<AtomicU64>,
    pub goals_emitted: Arc<AtomicU64>,
    pub approaches_stalled: Arc<AtomicU64>,
    pub detector_time_us: Arc<AtomicU64>,
    pub detector_time_max_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl Default for ControllerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerMetrics {
    pub fn new() -> Self {
        Self {
            ticks: Arc::new(AtomicU64::new(0)),
            ticks_waiting: Arc::new(AtomicU64::new(0)),
            ticks_failed: Arc::new(AtomicU64::new(0)),
            overruns: Arc::new(AtomicU64::new(0)),
            goals_emitted: Arc::new(AtomicU64::new(0)),
            approaches_stalled: Arc::new(AtomicU64::new(0)),
            detector_time_us: Arc::new(AtomicU64::new(0)),
            detector_time_max_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detector_time(&self, duration_us: u64) {
        self.detector_time_us.store(duration_us, Ordering::Relaxed);
        self.detector_time_max_us
            .fetch_max(duration_us, Ordering::Relaxed);
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            ticks: self.ticks.load(Ordering::Relaxed),
            ticks_waiting: self.ticks_waiting.load(Ordering::Relaxed),
            ticks_failed: self.ticks_failed.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            goals_emitted: self.goals_emitted.load(Ordering::Relaxed),
            approaches_stalled: self.approaches_stalled.load(Ordering::Relaxed),
            last_detector_us: self.detector_time_us.load(Ordering::Relaxed),
            max_detector_us: self.detector_time_max_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MetricsSummary {
    pub ticks: u64,
    pub ticks_waiting: u64,
    pub ticks_failed: u64,
    pub overruns: u64,
    pub goals_emitted: u64,
    pub approaches_stalled: u64,
    pub last_detector_us: u64,
    pub max_detector_us: u64,
    pub elapsed_secs: f64,
}
