//! Ingestion metrics.
//!
//! Counters are atomics; duration samples sit behind a mutex and feed the
//! P50/P95/P99 figures reported by the health endpoint.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Maximum number of duration samples kept in memory.
const MAX_DURATION_SAMPLES: usize = 1000;

/// Thread-safe ingestion counters shared by every pipeline run.
#[derive(Debug)]
pub struct ConversionMetrics {
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    panicked: AtomicU64,
    parts_written: AtomicU64,
    node_indices_patched: AtomicU64,
    duration_samples: Mutex<Vec<Duration>>,
}

impl ConversionMetrics {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self {
            started: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
            parts_written: AtomicU64::new(0),
            node_indices_patched: AtomicU64::new(0),
            duration_samples: Mutex::new(Vec::with_capacity(MAX_DURATION_SAMPLES)),
        }
    }

    /// A pipeline entered `processing`.
    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    /// A pipeline ended `completed`.
    pub fn record_completed(&self, duration: Duration) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.add_duration_sample(duration);
    }

    /// A pipeline ended `failed`.
    pub fn record_failed(&self, duration: Duration) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.add_duration_sample(duration);
    }

    /// An external process hit its deadline. Counted in addition to the failure.
    pub fn record_timeout(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    /// A pipeline task panicked.
    pub fn record_panic(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    /// Parts written by one reconciliation.
    pub fn record_parts(&self, written: u64, patched: u64) {
        self.parts_written.fetch_add(written, Ordering::Relaxed);
        self.node_indices_patched.fetch_add(patched, Ordering::Relaxed);
    }

    fn add_duration_sample(&self, duration: Duration) {
        if let Ok(mut samples) = self.duration_samples.lock() {
            if samples.len() >= MAX_DURATION_SAMPLES {
                samples.remove(0);
            }
            samples.push(duration);
        }
    }

    /// Current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let durations = self
            .duration_samples
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default();
        let (p50, p95, p99) = percentiles(&durations);

        MetricsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            parts_written: self.parts_written.load(Ordering::Relaxed),
            node_indices_patched: self.node_indices_patched.load(Ordering::Relaxed),
            duration_p50_ms: p50.map(as_millis),
            duration_p95_ms: p95.map(as_millis),
            duration_p99_ms: p99.map(as_millis),
            sample_count: durations.len() as u64,
        }
    }
}

impl Default for ConversionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn percentiles(durations: &[Duration]) -> (Option<Duration>, Option<Duration>, Option<Duration>) {
    if durations.is_empty() {
        return (None, None, None);
    }
    let mut sorted = durations.to_vec();
    sorted.sort();
    let len = sorted.len();

    (
        sorted.get(len * 50 / 100).copied(),
        sorted.get(len * 95 / 100).copied(),
        sorted.get(len.saturating_sub(1) * 99 / 100).copied(),
    )
}

fn as_millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

/// A point-in-time copy of the counters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub panicked: u64,
    pub parts_written: u64,
    pub node_indices_patched: u64,
    pub duration_p50_ms: Option<u64>,
    pub duration_p95_ms: Option<u64>,
    pub duration_p99_ms: Option<u64>,
    pub sample_count: u64,
}
