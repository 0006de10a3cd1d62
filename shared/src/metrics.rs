use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one collection controller.
#[derive(Debug, Default)]
pub struct FetchMetrics {
    pub fetches_started: AtomicU64,
    pub pages_applied: AtomicU64,
    pub fetches_failed: AtomicU64,
    // superseded by a newer fetch, or reported cancelled by the collaborator
    pub fetches_discarded: AtomicU64,
    pub duplicates_dropped: AtomicU64,
    pub searches_debounced: AtomicU64,
    pub load_more_skipped: AtomicU64,
}

impl FetchMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fetches_started: self.fetches_started.load(Ordering::Relaxed),
            pages_applied: self.pages_applied.load(Ordering::Relaxed),
            fetches_failed: self.fetches_failed.load(Ordering::Relaxed),
            fetches_discarded: self.fetches_discarded.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
            searches_debounced: self.searches_debounced.load(Ordering::Relaxed),
            load_more_skipped: self.load_more_skipped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub fetches_started: u64,
    pub pages_applied: u64,
    pub fetches_failed: u64,
    pub fetches_discarded: u64,
    pub duplicates_dropped: u64,
    pub searches_debounced: u64,
    pub load_more_skipped: u64,
}

impl MetricsSnapshot {
    /// Fetches that started but have not yet applied, failed or been discarded.
    #[must_use]
    pub const fn in_flight(&self) -> u64 {
        self.fetches_started
            .saturating_sub(self.pages_applied + self.fetches_failed + self.fetches_discarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reads_counters() {
        let metrics = FetchMetrics::new();
        FetchMetrics::incr(&metrics.fetches_started);
        FetchMetrics::incr(&metrics.fetches_started);
        FetchMetrics::incr(&metrics.pages_applied);
        FetchMetrics::add(&metrics.duplicates_dropped, 3);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.fetches_started, 2);
        assert_eq!(snapshot.pages_applied, 1);
        assert_eq!(snapshot.duplicates_dropped, 3);
        assert_eq!(snapshot.in_flight(), 1);
    }
}
