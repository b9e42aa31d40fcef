use serde::{Deserialize, Serialize};

/// Default latency bucket upper bounds in milliseconds
pub const DEFAULT_BIN_EDGES_MS: [f64; 9] = [1.0, 2.0, 4.0, 8.0, 16.0, 33.0, 66.0, 100.0, 200.0];

/// One bucket with an inclusive upper bound
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub upper_ms: f64,
    pub count: u64,
}

/// Latency distribution over fixed upper bounds plus an overflow bucket
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LatencyHistogram {
    pub buckets: Vec<HistogramBucket>,
    /// Samples above every upper bound
    pub over: u64,
}

impl LatencyHistogram {
    /// Bucket `samples` by the smallest edge that is >= the sample
    pub fn from_samples(samples: &[f64], edges_ms: &[f64]) -> Self {
        let mut edges: Vec<f64> = edges_ms.iter().copied().filter(|e| !e.is_nan()).collect();
        edges.sort_by(f64::total_cmp);
        edges.dedup();

        let mut buckets: Vec<HistogramBucket> = edges
            .iter()
            .map(|&upper_ms| HistogramBucket { upper_ms, count: 0 })
            .collect();
        let mut over = 0;

        for &sample in samples {
            // First edge that is not below the sample
            let idx = edges.partition_point(|&edge| edge < sample);
            match buckets.get_mut(idx) {
                Some(bucket) if !sample.is_nan() => bucket.count += 1,
                _ => over += 1,
            }
        }

        Self { buckets, over }
    }

    /// Count for the bucket with this upper bound
    pub fn count(&self, upper_ms: f64) -> Option<u64> {
        self.buckets
            .iter()
            .find(|b| b.upper_ms == upper_ms)
            .map(|b| b.count)
    }

    /// Sum of every bucket including the overflow
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum::<u64>() + self.over
    }

    /// Running totals per upper bound, as used by exposition formats
    pub fn cumulative(&self) -> Vec<(f64, u64)> {
        let mut running = 0;
        self.buckets
            .iter()
            .map(|b| {
                running += b.count;
                (b.upper_ms, running)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_smallest_edge_at_or_above() {
        let samples = [0.5, 1.0, 1.5, 2.0, 150.0, 200.0, 201.0, -3.0];
        let hist = LatencyHistogram::from_samples(&samples, &DEFAULT_BIN_EDGES_MS);

        assert_eq!(hist.count(1.0), Some(3)); // 0.5, 1.0, -3.0
        assert_eq!(hist.count(2.0), Some(2)); // 1.5, 2.0
        assert_eq!(hist.count(200.0), Some(2)); // 150.0, 200.0
        assert_eq!(hist.over, 1); // 201.0
        assert_eq!(hist.total(), samples.len() as u64);
    }

    #[test]
    fn test_unsorted_edges() {
        let hist = LatencyHistogram::from_samples(&[3.0, 7.0, 12.0], &[10.0, 5.0]);
        assert_eq!(hist.buckets[0].upper_ms, 5.0);
        assert_eq!(hist.count(5.0), Some(1));
        assert_eq!(hist.count(10.0), Some(1));
        assert_eq!(hist.over, 1);
    }

    #[test]
    fn test_no_edges_means_everything_overflows() {
        let hist = LatencyHistogram::from_samples(&[1.0, 2.0], &[]);
        assert!(hist.buckets.is_empty());
        assert_eq!(hist.over, 2);
    }

    #[test]
    fn test_total_matches_sample_count() {
        let mut rng = rand::thread_rng();

        for _ in 0..50 {
            let samples: Vec<f64> = (0..rng.gen_range(0..500))
                .map(|_| rng.gen_range(-10.0..400.0))
                .collect();
            let edges: Vec<f64> = (0..rng.gen_range(0..12))
                .map(|_| rng.gen_range(0.0..300.0))
                .collect();

            let hist = LatencyHistogram::from_samples(&samples, &edges);
            assert_eq!(hist.total(), samples.len() as u64);
        }
    }

    #[test]
    fn test_cumulative() {
        let hist = LatencyHistogram::from_samples(&[0.5, 1.5, 1.7, 300.0], &[1.0, 2.0, 4.0]);
        assert_eq!(hist.cumulative(), vec![(1.0, 1), (2.0, 3), (4.0, 3)]);
        assert_eq!(hist.total(), 4);
    }
}
