// ═══════════════════════════════════════════════════════════════
// METRICS - counters for one crawl run
// ═══════════════════════════════════════════════════════════════
//
// Atomic counters, bumped by the drivers and the pipeline, read once at the
// end of a run and logged as JSON. No server: a crawl is a short-lived
// process and its log line is the dashboard.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// What gets serialized at the end of a run
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub pages_fetched: u64,
    pub fetch_failures: u64,
    pub rows_seen: u64,
    pub rows_skipped: u64,
    pub records_extracted: u64,
    pub batches_sent: u64,
    pub sink_failures: u64,
    pub elapsed_seconds: f64,
}

pub struct CrawlMetrics {
    pages_fetched: AtomicU64,
    fetch_failures: AtomicU64,
    rows_seen: AtomicU64,
    rows_skipped: AtomicU64,
    records_extracted: AtomicU64,
    batches_sent: AtomicU64,
    sink_failures: AtomicU64,
    start_time: Instant,
}

impl Default for CrawlMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlMetrics {
    pub fn new() -> Self {
        Self {
            pages_fetched: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            rows_seen: AtomicU64::new(0),
            rows_skipped: AtomicU64::new(0),
            records_extracted: AtomicU64::new(0),
            batches_sent: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn increment_pages_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fetch_failures(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_rows_seen(&self, n: usize) {
        self.rows_seen.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn increment_rows_skipped(&self) {
        self.rows_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_records_extracted(&self, n: usize) {
        self.records_extracted.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Record the outcome of one batch handed to the sink.
    pub fn record_batch(&self, accepted: bool) {
        if accepted {
            self.batches_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.sink_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            rows_seen: self.rows_seen.load(Ordering::Relaxed),
            rows_skipped: self.rows_skipped.load(Ordering::Relaxed),
            records_extracted: self.records_extracted.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }
}
