//! Progress counters for a scan.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Atomic counters shared between the result consumer and the progress reporter.
pub struct ScanStats {
    pub capable: AtomicU64,
    pub incapable: AtomicU64,
    started: Instant,
}

impl ScanStats {
    pub fn new() -> Self {
        Self {
            capable: AtomicU64::new(0),
            incapable: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn record(&self, is_doh_capable: bool) {
        if is_doh_capable {
            self.capable.fetch_add(1, Ordering::Relaxed);
        } else {
            self.incapable.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let capable = self.capable.load(Ordering::Relaxed);
        let incapable = self.incapable.load(Ordering::Relaxed);
        let elapsed_secs = self.started.elapsed().as_secs_f64();
        let processed = capable + incapable;

        let rate_per_sec = if elapsed_secs > 0.0 {
            processed as f64 / elapsed_secs
        } else {
            0.0
        };

        StatsSnapshot {
            processed,
            capable,
            incapable,
            elapsed_secs,
            rate_per_sec,
        }
    }
}

impl Default for ScanStats {
    fn default() -> Self {
        Self::new()
    }
}

pub struct StatsSnapshot {
    pub processed: u64,
    pub capable: u64,
    pub incapable: u64,
    pub elapsed_secs: f64,
    pub rate_per_sec: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_splits_by_capability() {
        let stats = ScanStats::new();
        stats.record(true);
        stats.record(false);
        stats.record(false);

        let snapshot = stats.snapshot();

        assert_eq!(snapshot.processed, 3);
        assert_eq!(snapshot.capable, 1);
        assert_eq!(snapshot.incapable, 2);
    }
}
