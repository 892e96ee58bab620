//! Replication metrics collection.
//!
//! Provides counters for monitoring how much the
//! scheduler sends and how much the observers correct.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the authoritative and observing replicators.
pub struct ReplicationMetrics {
    ticks: AtomicU64,
    batches_sent: AtomicU64,
    records_sent: AtomicU64,
    records_dropped: AtomicU64,
    corrections_applied: AtomicU64,
    suspect_updates: AtomicU64,
}

impl Default for ReplicationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicationMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            batches_sent: AtomicU64::new(0),
            records_sent: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
            corrections_applied: AtomicU64::new(0),
            suspect_updates: AtomicU64::new(0),
        }
    }

    /// Records one scheduler tick and the number of records it flushed.
    pub fn record_tick(&self, visited: usize, records: usize) {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if records > 0 {
            self.batches_sent.fetch_add(1, Ordering::Relaxed);
            self.records_sent
                .fetch_add(records as u64, Ordering::Relaxed);
        }

        // Log at info level every 100 ticks
        if tick.is_multiple_of(100) {
            tracing::info!(
                tick = tick,
                visited = visited,
                batches_sent = self.batches_sent(),
                records_sent = self.records_sent(),
                "Replication tick"
            );
        }
    }

    pub fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_correction(&self) {
        self.corrections_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_suspect_update(&self) {
        self.suspect_updates.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn batches_sent(&self) -> u64 {
        self.batches_sent.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn records_sent(&self) -> u64 {
        self.records_sent.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn records_dropped(&self) -> u64 {
        self.records_dropped.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn corrections_applied(&self) -> u64 {
        self.corrections_applied.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn suspect_updates(&self) -> u64 {
        self.suspect_updates.load(Ordering::Relaxed)
    }
}
