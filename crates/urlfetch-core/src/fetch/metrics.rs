//! Success/failure counters shared by every fetch task.
//!
//! Write-many, read-once: tasks only ever `fetch_add`, and the driver takes a
//! snapshot after the fetch stage has joined every task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct FetchMetrics {
    succeeded: AtomicU64,
    failed: AtomicU64,
    success_nanos: AtomicU64,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful fetch that took `elapsed`.
    pub fn record_success(&self, elapsed: Duration) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.success_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            success_nanos: self.success_nanos.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`FetchMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub succeeded: u64,
    pub failed: u64,
    /// Sum of wall-clock durations of successful fetches.
    pub success_nanos: u64,
}

impl MetricsSnapshot {
    /// Every URL that reached a terminal outcome.
    pub fn attempted(&self) -> u64 {
        self.succeeded + self.failed
    }

    pub fn total_success_duration(&self) -> Duration {
        Duration::from_nanos(self.success_nanos)
    }

    /// Mean duration of successful fetches (zero when nothing succeeded).
    pub fn avg_success_duration(&self) -> Duration {
        Duration::from_nanos(self.success_nanos / self.succeeded.max(1))
    }
}
