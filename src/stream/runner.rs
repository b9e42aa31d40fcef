//! In-process run: one producer task and one consumer task over a bus pair,
//! plus an optional observer that reports live statistics.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};

use crate::bus::{make_bus_pair, BusConfig, BusPair};
use crate::metrics::set_summary_gauges;
use crate::stats::{StreamStats, Summary};
use crate::stream::consumer::Consumer;
use crate::stream::error::{StreamError, StreamResult};
use crate::stream::producer::{Producer, ProducerConfig, ProducerReport};

/// Full description of one in-process run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub bus: BusConfig,
    pub producer: ProducerConfig,
    /// Period of live summary reports; `None` disables the observer
    pub live_interval: Option<Duration>,
}

impl RunConfig {
    pub fn new(bus: BusConfig, producer: ProducerConfig) -> Self {
        Self {
            bus,
            producer,
            live_interval: None,
        }
    }

    pub fn with_live_interval(mut self, interval: Duration) -> Self {
        self.live_interval = Some(interval);
        self
    }
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub summary: Summary,
    pub producer: ProducerReport,
    pub received: u64,
}

fn task_failed(task: &'static str, e: JoinError) -> StreamError {
    StreamError::TaskFailed {
        task,
        reason: e.to_string(),
    }
}

/// Periodically log the running summary and mirror it into gauges
pub fn spawn_observer(stats: Arc<StreamStats>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let summary = stats.summary();
            set_summary_gauges(&summary);
            tracing::info!(
                "live: tx={} rx={} loss={:.1}% p50={:?}ms fps={:?}",
                summary.tx,
                summary.rx,
                summary.loss_pct,
                summary.lat_p50,
                summary.fps
            );
        }
    })
}

pub struct StreamRunner {
    config: RunConfig,
    stats: Arc<StreamStats>,
}

impl StreamRunner {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            stats: Arc::new(StreamStats::new()),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Statistics shared with the running tasks
    pub fn stats(&self) -> Arc<StreamStats> {
        self.stats.clone()
    }

    /// Build the bus pair from the config and run on it
    pub async fn run(&self) -> StreamResult<RunOutcome> {
        // Reject bad producer settings before binding any transport
        self.config.producer.build()?;
        let pair = make_bus_pair(&self.config.bus).await?;
        self.run_on(pair).await
    }

    /// Run producer and consumer concurrently on an existing bus pair
    ///
    /// A producer failure cancels the consumer and is returned as-is.
    pub async fn run_on(&self, pair: BusPair) -> StreamResult<RunOutcome> {
        let producer_config = &self.config.producer;
        let producer = Producer::new(pair.publisher, self.stats.clone(), producer_config)?;
        let consumer = Consumer::new(pair.subscriber, self.stats.clone(), producer_config.duration);

        tracing::info!(
            "Starting run: kind={} codec={} rate={}Hz duration={:?} bus={}",
            producer_config.kind,
            producer_config.codec,
            producer_config.rate_hz,
            producer_config.duration,
            self.config.bus.kind
        );

        let observer = self
            .config
            .live_interval
            .map(|interval| spawn_observer(self.stats.clone(), interval));
        let consumer_task = tokio::spawn(consumer.run());
        let producer_task = tokio::spawn(producer.run());

        let produced = producer_task.await;
        let report = match produced {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                consumer_task.abort();
                if let Some(observer) = observer {
                    observer.abort();
                }
                tracing::error!("Producer failed: {}", e);
                return Err(e);
            }
            Err(e) => {
                consumer_task.abort();
                if let Some(observer) = observer {
                    observer.abort();
                }
                return Err(task_failed("producer", e));
            }
        };

        let consumed = consumer_task.await;
        if let Some(observer) = observer {
            observer.abort();
        }
        let received = consumed.map_err(|e| task_failed("consumer", e))??;

        let summary = self.stats.summary();
        set_summary_gauges(&summary);
        tracing::info!(
            "Run finished: tx={} rx={} loss={}% fps={:?}",
            summary.tx,
            summary.rx,
            summary.loss_pct,
            summary.fps
        );

        Ok(RunOutcome {
            summary,
            producer: report,
            received,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::ImpairmentConfig;
    use crate::frame::{Codec, SignalKind};

    fn quick(rate_hz: f64, millis: u64) -> ProducerConfig {
        ProducerConfig::new(SignalKind::Rgb, Codec::Lz4)
            .with_dimensions(32, 24)
            .with_rate(rate_hz)
            .with_duration(Duration::from_millis(millis))
    }

    #[tokio::test]
    async fn test_memory_run_delivers_everything() {
        let runner = StreamRunner::new(RunConfig::new(BusConfig::memory(), quick(10.0, 480)));
        let outcome = runner.run().await.unwrap();

        // Ticks at 0, 100, 200, 300 and 400 ms
        assert_eq!(outcome.summary.tx, 5);
        assert_eq!(outcome.summary.rx, 5);
        assert_eq!(outcome.summary.loss_pct, 0.0);
        assert_eq!(outcome.received, 5);
        assert!(outcome.summary.lat_p95.is_some());
    }

    #[tokio::test]
    async fn test_full_receive_drop() {
        let bus = BusConfig::memory().with_impairment(ImpairmentConfig {
            drop_pct_rx: 100.0,
            ..Default::default()
        });
        let runner = StreamRunner::new(RunConfig::new(bus, quick(50.0, 200)));
        let outcome = runner.run().await.unwrap();

        assert_eq!(outcome.summary.rx, 0);
        assert_eq!(outcome.summary.loss_pct, 100.0);
        assert!(outcome.summary.lat_p50.is_none());
        assert!(outcome.summary.fps.is_none());
    }

    #[tokio::test]
    async fn test_invalid_rate_rejected_before_start() {
        let runner = StreamRunner::new(RunConfig::new(BusConfig::memory(), quick(0.0, 100)));
        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, StreamError::InvalidRate(_)));
        assert_eq!(runner.stats().count_tx(), 0);
    }

    #[tokio::test]
    async fn test_observer_does_not_block_completion() {
        let config = RunConfig::new(BusConfig::memory(), quick(20.0, 300))
            .with_live_interval(Duration::from_millis(50));
        let outcome = StreamRunner::new(config).run().await.unwrap();
        assert_eq!(outcome.summary.tx, 6);
    }

    #[test]
    fn test_run_config_from_json() {
        let config: RunConfig = serde_json::from_str(
            r#"{"bus": {"kind": "memory", "impairment": {"drop_pct_rx": 5.0}},
                "producer": {"kind": "tof", "codec": "zstd16", "rate_hz": 15.0}}"#,
        )
        .unwrap();

        assert_eq!(config.producer.kind, SignalKind::Tof);
        assert_eq!(config.producer.rate_hz, 15.0);
        assert_eq!(config.bus.impairment.drop_pct_rx, 5.0);
        assert!(config.live_interval.is_none());
    }
}
