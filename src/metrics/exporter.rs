//! Prometheus metrics exporter
//!
//! Serves the stream metrics over HTTP for Prometheus scraping while a run is
//! in progress.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::OnceLock;

use crate::metrics::recorder::init_metrics;

/// Global prometheus handle
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const DEFAULT_METRICS_PORT: u16 = 9090;

/// Metrics server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Address the scrape endpoint listens on
    pub listen_addr: SocketAddr,

    /// Latency histogram buckets in milliseconds; empty means summary quantiles
    pub latency_buckets_ms: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_METRICS_PORT)),
            latency_buckets_ms: crate::stats::DEFAULT_BIN_EDGES_MS.to_vec(),
        }
    }
}

impl MetricsConfig {
    /// Create a new config with custom address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Errors that can occur during metrics setup
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to setup metrics: {0}")]
    SetupFailed(String),
}

/// Install the global recorder and spawn the HTTP listener on the current runtime
///
/// Only the first call installs anything; later calls return the existing handle.
pub fn start_metrics_server(
    config: MetricsConfig,
) -> Result<&'static PrometheusHandle, MetricsError> {
    init_metrics();

    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle);
    }

    let mut builder = PrometheusBuilder::new().with_http_listener(config.listen_addr);
    if !config.latency_buckets_ms.is_empty() {
        builder = builder
            .set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Full(
                    crate::metrics::recorder::LATENCY_MS.to_string(),
                ),
                &config.latency_buckets_ms,
            )
            .map_err(|e| MetricsError::SetupFailed(e.to_string()))?;
    }

    let (recorder, exporter) = builder
        .build()
        .map_err(|e| MetricsError::SetupFailed(e.to_string()))?;
    let handle = recorder.handle();

    metrics::set_global_recorder(recorder)
        .map_err(|e| MetricsError::SetupFailed(e.to_string()))?;

    tokio::spawn(async move {
        if let Err(e) = exporter.await {
            tracing::warn!("Metrics exporter stopped: {:?}", e);
        }
    });
    tracing::info!("Serving metrics on http://{}/metrics", config.listen_addr);

    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle))
}

/// Render the current metrics in Prometheus text format, once the server is running
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::recorder::{record_packet_received, record_packet_sent};

    #[test]
    fn test_metrics_config_default() {
        let config = MetricsConfig::default();
        assert_eq!(config.listen_addr.port(), DEFAULT_METRICS_PORT);
        assert_eq!(config.latency_buckets_ms.len(), 9);
    }

    #[test]
    fn test_metrics_config_with_addr() {
        let config = MetricsConfig::with_addr("127.0.0.1:9191".parse().unwrap());
        assert_eq!(config.listen_addr.port(), 9191);
        assert_eq!(config.latency_buckets_ms, MetricsConfig::default().latency_buckets_ms);
    }

    // The only test in this crate that installs the global recorder
    #[tokio::test]
    async fn test_server_renders_stream_metrics() {
        let config = MetricsConfig::with_addr("127.0.0.1:0".parse().unwrap());
        start_metrics_server(config.clone()).unwrap();
        // Second start reuses the installed recorder
        start_metrics_server(config).unwrap();

        record_packet_sent("rgb", 2048);
        record_packet_received(3.0);

        let text = render_metrics().expect("server started");
        assert!(text.contains("stream_packets_sent_total"));
        assert!(text.contains("stream_bytes_sent_total"));
        assert!(text.contains("stream_latency_ms_bucket"));
    }
}
