//! Admission limiter: caps the number of fetches in flight.
//!
//! Thin wrapper over a Tokio semaphore. Permits are owned so they can move
//! into the spawned fetch task; dropping the permit (on any exit path of the
//! task) releases exactly one slot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Default cap on concurrent fetches.
pub const DEFAULT_MAX_CONCURRENT: usize = 50;

#[derive(Debug, Default)]
struct Gauge {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Counting gate sized at the configured cap. Clones share the same permits.
#[derive(Debug, Clone)]
pub struct AdmissionLimiter {
    semaphore: Arc<Semaphore>,
    max_permits: usize,
    gauge: Arc<Gauge>,
}

impl AdmissionLimiter {
    /// Creates a limiter with `max_concurrent` permits (at least 1).
    pub fn new(max_concurrent: usize) -> Self {
        let max_permits = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_permits)),
            max_permits,
            gauge: Arc::new(Gauge::default()),
        }
    }

    /// Waits for a free slot. Tokio's semaphore is FIFO-fair, so waiters are
    /// admitted in arrival order.
    pub async fn acquire(&self) -> Result<AdmissionPermit, AcquireError> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await?;
        let current = self.gauge.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.gauge.peak.fetch_max(current, Ordering::AcqRel);
        Ok(AdmissionPermit {
            _permit: permit,
            gauge: Arc::clone(&self.gauge),
        })
    }

    pub fn max_permits(&self) -> usize {
        self.max_permits
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.gauge.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of permits held at the same time since creation.
    pub fn peak_in_flight(&self) -> usize {
        self.gauge.peak.load(Ordering::Acquire)
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// One admitted fetch. Releases its slot when dropped.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
    gauge: Arc<Gauge>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.gauge.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
