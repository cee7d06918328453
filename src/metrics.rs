//! Query counters and a sliding window of recent query latencies.

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Number of recent latencies kept for the latency summary.
pub const LATENCY_WINDOW: usize = 1024;

/// Latencies of the most recent queries, in microseconds.
#[derive(Debug)]
struct LatencyWindow {
    samples: VecDeque<u64>,
    capacity: usize,
    sum: u128,
}

impl LatencyWindow {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            sum: 0,
        }
    }

    fn push(&mut self, micros: u64) {
        if self.samples.len() == self.capacity {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= u128::from(oldest);
            }
        }
        self.samples.push_back(micros);
        self.sum += u128::from(micros);
    }

    fn summary(&self) -> LatencySummary {
        if self.samples.is_empty() {
            return LatencySummary::default();
        }
        let mut sorted: Vec<u64> = self.samples.iter().copied().collect();
        sorted.sort_unstable();
        // Nearest-rank percentile over the window.
        let rank = |p: f64| {
            let idx = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
            sorted[idx.clamp(1, sorted.len()) - 1]
        };
        LatencySummary {
            samples: sorted.len(),
            mean_us: self.sum as f64 / sorted.len() as f64,
            p50_us: rank(50.0),
            p95_us: rank(95.0),
            p99_us: rank(99.0),
            max_us: sorted[sorted.len() - 1],
        }
    }
}

/// Latency statistics over the current window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub samples: usize,
    pub mean_us: f64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Point-in-time view served by `GET /metrics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_queries: u64,
    pub failed_queries: u64,
    pub total_hits: u64,
    pub latency: LatencySummary,
}

/// Query metrics for a running server. Counters cover the process lifetime;
/// latencies cover only the last [`LATENCY_WINDOW`] successful queries.
#[derive(Debug)]
pub struct QueryMetrics {
    total_queries: u64,
    failed_queries: u64,
    total_hits: u64,
    latencies: LatencyWindow,
}

impl QueryMetrics {
    pub fn new() -> Self {
        Self::with_window(LATENCY_WINDOW)
    }

    pub fn with_window(capacity: usize) -> Self {
        Self {
            total_queries: 0,
            failed_queries: 0,
            total_hits: 0,
            latencies: LatencyWindow::with_capacity(capacity),
        }
    }

    pub fn record_query(&mut self, elapsed: Duration, hits: usize) {
        self.total_queries += 1;
        self.total_hits += hits as u64;
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.latencies.push(micros);
    }

    pub fn record_failure(&mut self) {
        self.failed_queries += 1;
    }

    pub fn failed_queries(&self) -> u64 {
        self.failed_queries
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_queries: self.total_queries,
            failed_queries: self.failed_queries,
            total_hits: self.total_hits,
            latency: self.latencies.summary(),
        }
    }
}

impl Default for QueryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn us(n: u64) -> Duration {
        Duration::from_micros(n)
    }

    #[test]
    fn test_counters() {
        let mut m = QueryMetrics::new();
        m.record_query(us(10), 3);
        m.record_query(us(10), 2);
        m.record_failure();

        let snap = m.snapshot();
        assert_eq!(snap.total_queries, 2);
        assert_eq!(snap.total_hits, 5);
        assert_eq!(snap.failed_queries, 1);
        assert_eq!(m.failed_queries(), 1);
    }

    #[test]
    fn test_latency_summary() {
        let mut m = QueryMetrics::new();
        for micros in [300, 100, 200, 400] {
            m.record_query(us(micros), 1);
        }

        let latency = m.snapshot().latency;
        assert_eq!(latency.samples, 4);
        assert_eq!(latency.mean_us, 250.0);
        assert_eq!(latency.p50_us, 200);
        assert_eq!(latency.p99_us, 400);
        assert_eq!(latency.max_us, 400);
    }

    #[test]
    fn test_window_is_capped() {
        let mut m = QueryMetrics::with_window(3);
        for micros in 1..=10 {
            m.record_query(us(micros * 100), 0);
        }

        let snap = m.snapshot();
        assert_eq!(snap.total_queries, 10);
        assert_eq!(snap.latency.samples, 3);
        assert_eq!(snap.latency.mean_us, 900.0);
        assert_eq!(snap.latency.p50_us, 900);
        assert_eq!(snap.latency.max_us, 1000);
    }

    #[test]
    fn test_default_window_size() {
        let mut m = QueryMetrics::default();
        for _ in 0..LATENCY_WINDOW + 50 {
            m.record_query(us(5), 1);
        }
        assert_eq!(m.snapshot().latency.samples, LATENCY_WINDOW);
    }

    #[test]
    fn test_empty_summary() {
        let snap = QueryMetrics::new().snapshot();
        assert_eq!(snap.latency, LatencySummary::default());
        assert_eq!(snap.total_queries, 0);
    }
}
