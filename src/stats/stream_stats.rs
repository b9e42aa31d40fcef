//! Online stream statistics shared by the producer and consumer

use parking_lot::Mutex;

use crate::stats::histogram::{LatencyHistogram, DEFAULT_BIN_EDGES_MS};
use crate::stats::quantile::{mean, quantile_sorted};
use crate::stats::types::{round3, Summary};

/// Minimum number of latency samples before a p95 is reported
pub const MIN_SAMPLES_FOR_P95: usize = 5;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Default)]
struct StatsState {
    count_tx: u64,
    count_rx: u64,
    bytes_tx: u64,
    /// Arrival order
    latencies_ms: Vec<f64>,
    first_rx_time_ms: Option<f64>,
    last_rx_time_ms: Option<f64>,
}

impl StatsState {
    fn fps(&self) -> Option<f64> {
        let (first, last) = (self.first_rx_time_ms?, self.last_rx_time_ms?);
        let span_s = (last - first) / 1000.0;
        if span_s > 0.0 {
            Some(self.count_rx as f64 / span_s)
        } else {
            None
        }
    }
}

/// Aggregates transmit and receive events for one run.
///
/// Every call takes the same lock, so each `record_*` is atomic to readers
/// and `summary`/`histogram` see a consistent snapshot.
#[derive(Debug, Default)]
pub struct StreamStats {
    state: Mutex<StatsState>,
}

impl StreamStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one transmitted payload of `nbytes`
    pub fn record_tx(&self, nbytes: usize) {
        let mut state = self.state.lock();
        state.count_tx += 1;
        state.bytes_tx += nbytes as u64;
    }

    /// Count one received packet with its one-way latency
    ///
    /// `now_ms` feeds the frame-rate window: the first call sets its start,
    /// every call moves its end.
    pub fn record_rx(&self, latency_ms: f64, now_ms: Option<f64>) {
        let mut state = self.state.lock();
        state.count_rx += 1;
        state.latencies_ms.push(latency_ms);

        if let Some(now_ms) = now_ms {
            if state.first_rx_time_ms.is_none() {
                state.first_rx_time_ms = Some(now_ms);
            }
            state.last_rx_time_ms = Some(now_ms);
        }
    }

    pub fn count_tx(&self) -> u64 {
        self.state.lock().count_tx
    }

    pub fn count_rx(&self) -> u64 {
        self.state.lock().count_rx
    }

    pub fn bytes_tx(&self) -> u64 {
        self.state.lock().bytes_tx
    }

    /// Copy of the latency samples in arrival order
    pub fn latencies_ms(&self) -> Vec<f64> {
        self.state.lock().latencies_ms.clone()
    }

    /// Receive frame rate over the observed receive window
    pub fn fps(&self) -> Option<f64> {
        self.state.lock().fps()
    }

    pub fn summary(&self) -> Summary {
        let snapshot = self.state.lock().clone();

        let loss_pct = if snapshot.count_tx > 0 {
            let lost = snapshot.count_tx as f64 - snapshot.count_rx as f64;
            (100.0 * lost / snapshot.count_tx as f64).max(0.0)
        } else {
            0.0
        };

        let mut sorted = snapshot.latencies_ms.clone();
        sorted.sort_by(f64::total_cmp);

        let (lat_p50, lat_p95) = if sorted.is_empty() {
            (None, None)
        } else {
            let p95 = (sorted.len() >= MIN_SAMPLES_FOR_P95).then(|| quantile_sorted(&sorted, 0.95));
            (Some(quantile_sorted(&sorted, 0.5)), p95)
        };

        Summary {
            tx: snapshot.count_tx,
            rx: snapshot.count_rx,
            loss_pct: round3(loss_pct),
            bytes_tx: snapshot.bytes_tx,
            mb_tx: round3(snapshot.bytes_tx as f64 / BYTES_PER_MB),
            lat_p50: lat_p50.map(round3),
            lat_p95: lat_p95.map(round3),
            lat_mean: mean(&snapshot.latencies_ms).map(round3),
            fps: snapshot.fps().map(round3),
        }
    }

    /// Latency histogram over `edges_ms`; bucket counts sum to `count_rx`
    pub fn histogram(&self, edges_ms: &[f64]) -> LatencyHistogram {
        let state = self.state.lock();
        LatencyHistogram::from_samples(&state.latencies_ms, edges_ms)
    }

    /// Histogram over [`DEFAULT_BIN_EDGES_MS`]
    pub fn default_histogram(&self) -> LatencyHistogram {
        self.histogram(&DEFAULT_BIN_EDGES_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::sync::Arc;

    #[test]
    fn test_stats_basic() {
        let stats = StreamStats::new();
        for _ in 0..10 {
            stats.record_tx(1000);
        }
        for _ in 0..8 {
            stats.record_rx(5.0, None);
        }

        let summary = stats.summary();
        assert_eq!(summary.tx, 10);
        assert_eq!(summary.rx, 8);
        assert_eq!(summary.loss_pct, 20.0);
        assert_eq!(summary.bytes_tx, 10_000);
        assert_eq!(summary.lat_mean, Some(5.0));
        assert_eq!(summary.lat_p50, Some(5.0));
        assert_eq!(summary.lat_p95, Some(5.0));
        // No receive timestamps, no frame rate
        assert_eq!(summary.fps, None);
    }

    #[test]
    fn test_empty_summary() {
        let summary = StreamStats::new().summary();
        assert_eq!(summary.tx, 0);
        assert_eq!(summary.loss_pct, 0.0);
        assert_eq!(summary.lat_p50, None);
        assert_eq!(summary.lat_p95, None);
        assert_eq!(summary.lat_mean, None);
        assert_eq!(summary.fps, None);
    }

    #[test]
    fn test_loss_never_negative() {
        let stats = StreamStats::new();
        stats.record_tx(10);
        stats.record_rx(1.0, None);
        stats.record_rx(1.0, None);

        assert_eq!(stats.summary().loss_pct, 0.0);
    }

    #[test]
    fn test_loss_matches_formula() {
        let mut rng = rand::thread_rng();

        for _ in 0..100 {
            let stats = StreamStats::new();
            let tx = rng.gen_range(0..200u64);
            let rx = rng.gen_range(0..200u64);
            for _ in 0..tx {
                stats.record_tx(1);
            }
            for _ in 0..rx {
                stats.record_rx(1.0, None);
            }

            let expected = if tx > 0 {
                (100.0 * (tx as f64 - rx as f64) / tx as f64).max(0.0)
            } else {
                0.0
            };
            assert!((stats.summary().loss_pct - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn test_p95_needs_five_samples() {
        let stats = StreamStats::new();
        for latency in [1.0, 2.0, 3.0, 4.0] {
            stats.record_rx(latency, None);
        }
        assert_eq!(stats.summary().lat_p95, None);
        assert_eq!(stats.summary().lat_p50, Some(2.5));

        stats.record_rx(5.0, None);
        assert_eq!(stats.summary().lat_p95, Some(4.8));
    }

    #[test]
    fn test_hist_and_fps() {
        let stats = StreamStats::new();
        for i in 0..10 {
            stats.record_tx(100);
            stats.record_rx(5.0, Some(1000.0 + i as f64 * 100.0));
        }

        let hist = stats.default_histogram();
        assert_eq!(hist.total(), 10);
        assert_eq!(hist.count(8.0), Some(10));

        let fps = stats.fps().unwrap();
        assert!((fps - 10.0 / 0.9).abs() < 1e-9);
        assert_eq!(stats.summary().fps, Some(11.111));
    }

    #[test]
    fn test_fps_needs_positive_span() {
        let stats = StreamStats::new();
        stats.record_rx(1.0, Some(500.0));
        assert_eq!(stats.fps(), None);

        stats.record_rx(1.0, Some(500.0));
        assert_eq!(stats.fps(), None);

        stats.record_rx(1.0, Some(1500.0));
        assert_eq!(stats.fps(), Some(3.0));
    }

    #[test]
    fn test_mb_tx() {
        let stats = StreamStats::new();
        stats.record_tx(1024 * 1024);
        stats.record_tx(512 * 1024);
        assert_eq!(stats.summary().mb_tx, 1.5);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let stats = Arc::new(StreamStats::new());
        let per_thread = 10_000;

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        if t % 2 == 0 {
                            stats.record_tx(3);
                        } else {
                            stats.record_rx(i as f64, Some(i as f64));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.count_tx(), 2 * per_thread as u64);
        assert_eq!(stats.count_rx(), 2 * per_thread as u64);
        assert_eq!(stats.bytes_tx(), 6 * per_thread as u64);
        assert_eq!(stats.latencies_ms().len(), 2 * per_thread);
        assert_eq!(stats.default_histogram().total(), stats.count_rx());
    }
}
