//! Metrics registry
//!
//! Counters only. Values increase monotonically and reset on process start.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters shared by the executor, access gate and raw-query gate
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    queries_executed: AtomicU64,
    queries_rejected: AtomicU64,
    queries_failed: AtomicU64,
    auth_rejections: AtomicU64,
    raw_queries_executed: AtomicU64,
    raw_queries_rejected: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A query ran and was shaped
    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// A query failed validation
    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// A query failed in the store
    pub fn increment_queries_failed(&self) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_auth_rejections(&self) {
        self.auth_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_raw_queries_executed(&self) {
        self.raw_queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_raw_queries_rejected(&self) {
        self.raw_queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            auth_rejections: self.auth_rejections.load(Ordering::Relaxed),
            raw_queries_executed: self.raw_queries_executed.load(Ordering::Relaxed),
            raw_queries_rejected: self.raw_queries_rejected.load(Ordering::Relaxed),
        }
    }

    /// Snapshot rendered as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_executed: u64,
    pub queries_rejected: u64,
    pub queries_failed: u64,
    pub auth_rejections: u64,
    pub raw_queries_executed: u64,
    pub raw_queries_rejected: u64,
}
