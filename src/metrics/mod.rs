//! Metrics and observability module
//!
//! Mirrors stream events into the `metrics` facade:
//! - Packets and bytes published
//! - Packets received and their latency distribution
//! - Loss percentage and receive frame rate gauges

pub mod exporter;
pub mod recorder;

pub use exporter::{render_metrics, start_metrics_server, MetricsConfig, MetricsError};
pub use recorder::{init_metrics, record_packet_received, record_packet_sent, set_summary_gauges};
