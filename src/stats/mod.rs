//! Streaming statistics: loss, latency percentiles, histogram and frame rate

pub mod histogram;
pub mod quantile;
pub mod stream_stats;
pub mod types;

pub use histogram::{HistogramBucket, LatencyHistogram, DEFAULT_BIN_EDGES_MS};
pub use quantile::{mean, quantile, quantile_sorted};
pub use stream_stats::{StreamStats, MIN_SAMPLES_FOR_P95};
pub use types::Summary;
