//! Metrics collection and reporting

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// In-process counters for the inference service
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    total_inferences: AtomicU64,
    failed_inferences: AtomicU64,
    insufficient_samples: AtomicU64,
    undefined_confidence: AtomicU64,
    windows_voted: AtomicU64,
    undefined_windows: AtomicU64,
    sessions_persisted: AtomicU64,
    history_queries: AtomicU64,
    total_latency_us: AtomicU64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                total_inferences: AtomicU64::new(0),
                failed_inferences: AtomicU64::new(0),
                insufficient_samples: AtomicU64::new(0),
                undefined_confidence: AtomicU64::new(0),
                windows_voted: AtomicU64::new(0),
                undefined_windows: AtomicU64::new(0),
                sessions_persisted: AtomicU64::new(0),
                history_queries: AtomicU64::new(0),
                total_latency_us: AtomicU64::new(0),
            }),
        }
    }

    /// Record a successful inference over `windows` analysis windows
    pub fn record_inference(&self, latency_us: u64, windows: u64, undefined_windows: u64) {
        self.inner.total_inferences.fetch_add(1, Ordering::Relaxed);
        self.inner.windows_voted.fetch_add(windows, Ordering::Relaxed);
        self.inner
            .total_latency_us
            .fetch_add(latency_us, Ordering::Relaxed);
        self.inner
            .undefined_windows
            .fetch_add(undefined_windows, Ordering::Relaxed);
    }

    /// Record a failed inference by error kind
    pub fn record_failure(&self, kind: &str) {
        self.inner.failed_inferences.fetch_add(1, Ordering::Relaxed);
        match kind {
            "insufficient_samples" => {
                self.inner
                    .insufficient_samples
                    .fetch_add(1, Ordering::Relaxed);
            }
            "undefined_confidence" => {
                self.inner
                    .undefined_confidence
                    .fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Record a persisted session
    pub fn record_session_persisted(&self) {
        self.inner.sessions_persisted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a history lookup
    pub fn record_history_query(&self) {
        self.inner.history_queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_inferences: self.inner.total_inferences.load(Ordering::Relaxed),
            failed_inferences: self.inner.failed_inferences.load(Ordering::Relaxed),
            insufficient_samples: self.inner.insufficient_samples.load(Ordering::Relaxed),
            undefined_confidence: self.inner.undefined_confidence.load(Ordering::Relaxed),
            windows_voted: self.inner.windows_voted.load(Ordering::Relaxed),
            undefined_windows: self.inner.undefined_windows.load(Ordering::Relaxed),
            sessions_persisted: self.inner.sessions_persisted.load(Ordering::Relaxed),
            history_queries: self.inner.history_queries.load(Ordering::Relaxed),
            total_latency_us: self.inner.total_latency_us.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_inferences: u64,
    pub failed_inferences: u64,
    pub insufficient_samples: u64,
    pub undefined_confidence: u64,
    pub windows_voted: u64,
    pub undefined_windows: u64,
    pub sessions_persisted: u64,
    pub history_queries: u64,
    pub total_latency_us: u64,
}

impl MetricsSnapshot {
    /// Average latency per successful inference
    pub fn avg_latency_us(&self) -> u64 {
        if self.total_inferences == 0 {
            0
        } else {
            self.total_latency_us / self.total_inferences
        }
    }

    /// Share of requests that failed
    pub fn failure_rate(&self) -> f64 {
        let total = self.total_inferences + self.failed_inferences;
        if total == 0 {
            0.0
        } else {
            self.failed_inferences as f64 / total as f64
        }
    }
}
