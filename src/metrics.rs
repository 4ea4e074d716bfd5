use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-stage metrics collector
///
/// Clones share the same counters, so the pipeline can keep a handle while the
/// stage thread records into its own.
#[derive(Debug, Clone)]
pub struct StageMetrics {
    /// Values taken from upstream
    received: Arc<AtomicU64>,
    /// Values handed to downstream
    forwarded: Arc<AtomicU64>,
    /// Values rejected by a predicate
    discarded: Arc<AtomicU64>,
    /// Values evicted from a full ring buffer
    overwritten: Arc<AtomicU64>,
    /// Number of buffer flushes that emitted at least one value
    flushes: Arc<AtomicU64>,
    /// Creation time for throughput calculation
    start_time: Instant,
}

impl StageMetrics {
    /// Create a new metrics collector for a stage
    pub fn new() -> Self {
        Self {
            received: Arc::new(AtomicU64::new(0)),
            forwarded: Arc::new(AtomicU64::new(0)),
            discarded: Arc::new(AtomicU64::new(0)),
            overwritten: Arc::new(AtomicU64::new(0)),
            flushes: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Record a value taken from upstream
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a value handed downstream
    pub fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a value rejected by a predicate
    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a value evicted from a full buffer
    pub fn record_overwritten(&self) {
        self.overwritten.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a non-empty flush
    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the total number of values received
    pub fn total_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Get the total number of values forwarded
    pub fn total_forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Get the total number of values discarded
    pub fn total_discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Get the total number of values overwritten
    pub fn total_overwritten(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }

    /// Get the total number of flushes
    pub fn total_flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Forwarded values per second since creation
    pub fn throughput_vps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            0.0
        } else {
            self.total_forwarded() as f64 / elapsed
        }
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.total_received(),
            forwarded: self.total_forwarded(),
            discarded: self.total_discarded(),
            overwritten: self.total_overwritten(),
            flushes: self.total_flushes(),
            throughput_vps: self.throughput_vps(),
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for StageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub forwarded: u64,
    pub discarded: u64,
    pub overwritten: u64,
    pub flushes: u64,
    pub throughput_vps: f64,
    pub elapsed: Duration,
}

impl MetricsSnapshot {
    /// Format metrics as a human-readable string
    pub fn format(&self) -> String {
        format!(
            "Received: {}, Forwarded: {}, Discarded: {}, Overwritten: {}, Flushes: {}, \
             Throughput: {:.2} values/s, Elapsed: {:.2}s",
            self.received,
            self.forwarded,
            self.discarded,
            self.overwritten,
            self.flushes,
            self.throughput_vps,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = StageMetrics::new();
        let handle = metrics.clone();
        for _ in 0..10 {
            handle.record_received();
        }
        handle.record_forwarded();
        handle.record_discarded();
        assert_eq!(metrics.total_received(), 10);
        assert_eq!(metrics.total_forwarded(), 1);
        assert_eq!(metrics.total_discarded(), 1);
    }

    #[test]
    fn test_snapshot_format() {
        let metrics = StageMetrics::new();
        metrics.record_overwritten();
        metrics.record_flush();
        let line = metrics.snapshot().format();
        assert!(line.contains("Overwritten: 1"));
        assert!(line.contains("Flushes: 1"));
    }
}
