use serde_derive::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub struct Stats {
    started: Instant,
    requests: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub uptime_secs: u64,
    pub requests: u64,
    pub delivered: u64,
    pub failed: u64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            requests: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }
}

impl Stats {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            uptime_secs: self.uptime().as_secs(),
            requests: self.requests.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn counters_accumulate() {
        let stats = Stats::default();
        stats.record_request();
        stats.record_request();
        stats.record_delivery();
        stats.record_failure();

        let snapshot = stats.snapshot();
        assert_eq!((snapshot.requests, snapshot.delivered, snapshot.failed), (2, 1, 1));
    }
}
