// Bonding monitor counters
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Tracks bonding monitor activity
#[derive(Debug)]
pub struct MonitorMetrics {
    /// Completed poll attempts, successful or not
    pub polls: AtomicU64,
    /// Polls that failed upstream or in storage
    pub poll_failures: AtomicU64,
    /// Bonded tokens seen across all successful polls
    pub tokens_observed: AtomicU64,
    /// Bonding events emitted
    pub newly_bonded: AtomicU64,
    /// Epoch millis of the last poll; 0 = never
    last_poll_ms: AtomicI64,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        Self {
            polls: AtomicU64::new(0),
            poll_failures: AtomicU64::new(0),
            tokens_observed: AtomicU64::new(0),
            newly_bonded: AtomicU64::new(0),
            last_poll_ms: AtomicI64::new(0),
        }
    }

    pub fn record_success(&self, observed: usize, new_events: usize, at: DateTime<Utc>) {
        self.polls.fetch_add(1, Ordering::Relaxed);
        self.tokens_observed.fetch_add(observed as u64, Ordering::Relaxed);
        self.newly_bonded.fetch_add(new_events as u64, Ordering::Relaxed);
        self.last_poll_ms.store(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn record_failure(&self, at: DateTime<Utc>) {
        self.polls.fetch_add(1, Ordering::Relaxed);
        self.poll_failures.fetch_add(1, Ordering::Relaxed);
        self.last_poll_ms.store(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MonitorMetricsSnapshot {
        let last_poll_ms = self.last_poll_ms.load(Ordering::Relaxed);
        MonitorMetricsSnapshot {
            polls: self.polls.load(Ordering::Relaxed),
            poll_failures: self.poll_failures.load(Ordering::Relaxed),
            tokens_observed: self.tokens_observed.load(Ordering::Relaxed),
            newly_bonded: self.newly_bonded.load(Ordering::Relaxed),
            last_poll_at: (last_poll_ms > 0)
                .then(|| DateTime::from_timestamp_millis(last_poll_ms))
                .flatten(),
        }
    }
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable snapshot of monitor metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorMetricsSnapshot {
    pub polls: u64,
    pub poll_failures: u64,
    pub tokens_observed: u64,
    pub newly_bonded: u64,
    pub last_poll_at: Option<DateTime<Utc>>,
}

impl MonitorMetricsSnapshot {
    pub fn failure_rate_percent(&self) -> f64 {
        if self.polls == 0 {
            return 0.0;
        }
        (self.poll_failures as f64 / self.polls as f64) * 100.0
    }
}
