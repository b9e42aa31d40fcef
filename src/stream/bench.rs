//! Benchmark sweep over codec strategies and target rates

use serde::{Deserialize, Serialize};

use crate::frame::{Codec, SignalKind};
use crate::stats::Summary;
use crate::stream::error::StreamResult;
use crate::stream::runner::{RunConfig, StreamRunner};

/// Rates swept by default, in Hz
pub const DEFAULT_BENCH_RATES_HZ: [f64; 4] = [10.0, 20.0, 30.0, 60.0];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchCase {
    pub kind: SignalKind,
    pub codec: Codec,
    pub rate_hz: f64,
}

impl BenchCase {
    pub fn new(kind: SignalKind, codec: Codec, rate_hz: f64) -> Self {
        Self {
            kind,
            codec,
            rate_hz,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchResult {
    pub case: BenchCase,
    pub summary: Summary,
}

/// Every supported (kind, codec) pair crossed with `rates_hz`
pub fn bench_cases(rates_hz: &[f64]) -> Vec<BenchCase> {
    let pairs = [
        (SignalKind::Rgb, Codec::Lz4),
        (SignalKind::Rgb, Codec::Zstd),
        (SignalKind::Tof, Codec::Zstd16),
    ];

    pairs
        .iter()
        .flat_map(|&(kind, codec)| {
            rates_hz
                .iter()
                .map(move |&rate_hz| BenchCase::new(kind, codec, rate_hz))
        })
        .collect()
}

/// Run each case in turn with fresh statistics; the first failure stops the sweep
pub async fn run_bench(base: &RunConfig, cases: &[BenchCase]) -> StreamResult<Vec<BenchResult>> {
    let mut results = Vec::with_capacity(cases.len());

    for case in cases {
        let mut config = base.clone();
        config.producer.kind = case.kind;
        config.producer.codec = case.codec;
        config.producer.rate_hz = case.rate_hz;

        tracing::info!(
            "Bench case {}/{}: {} {} @ {}Hz",
            results.len() + 1,
            cases.len(),
            case.kind,
            case.codec,
            case.rate_hz
        );
        let outcome = StreamRunner::new(config).run().await?;
        results.push(BenchResult {
            case: *case,
            summary: outcome.summary,
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusConfig;
    use crate::stream::ProducerConfig;
    use std::time::Duration;

    #[test]
    fn test_default_sweep() {
        let cases = bench_cases(&DEFAULT_BENCH_RATES_HZ);
        assert_eq!(cases.len(), 12);
        assert_eq!(cases[0], BenchCase::new(SignalKind::Rgb, Codec::Lz4, 10.0));
        assert_eq!(cases[11], BenchCase::new(SignalKind::Tof, Codec::Zstd16, 60.0));
    }

    #[tokio::test]
    async fn test_run_bench_small() {
        let base = RunConfig::new(
            BusConfig::memory(),
            ProducerConfig::default()
                .with_dimensions(16, 16)
                .with_duration(Duration::from_millis(150)),
        );
        let cases = bench_cases(&[20.0]);

        let results = run_bench(&base, &cases).await.unwrap();
        assert_eq!(results.len(), 3);
        for result in &results {
            // Ticks at 0, 50 and 100 ms
            assert_eq!(result.summary.tx, 3);
        }
        assert_eq!(results[2].case.kind, SignalKind::Tof);
    }
}
