//! Metrics recorder for stream events
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder every
//! call is a no-op, so the stream loops call these unconditionally.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::stats::Summary;

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

pub const PACKETS_SENT: &str = "stream_packets_sent_total";
pub const PACKETS_RECEIVED: &str = "stream_packets_received_total";
pub const BYTES_SENT: &str = "stream_bytes_sent_total";
pub const LATENCY_MS: &str = "stream_latency_ms";
pub const LOSS_PCT: &str = "stream_loss_pct";
pub const FPS: &str = "stream_fps";

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    describe_counter!(PACKETS_SENT, "Total number of packets published");
    describe_counter!(PACKETS_RECEIVED, "Total number of packets received");
    describe_counter!(BYTES_SENT, "Total encoded payload bytes published");

    describe_histogram!(LATENCY_MS, "One-way packet latency in milliseconds");

    describe_gauge!(LOSS_PCT, "Packet loss percentage for the current run");
    describe_gauge!(FPS, "Receive frame rate for the current run");
}

/// Record one published payload
pub fn record_packet_sent(kind: &str, nbytes: usize) {
    counter!(PACKETS_SENT, "kind" => kind.to_string()).increment(1);
    counter!(BYTES_SENT, "kind" => kind.to_string()).increment(nbytes as u64);
}

/// Record one received packet and its latency
pub fn record_packet_received(latency_ms: f64) {
    counter!(PACKETS_RECEIVED).increment(1);
    histogram!(LATENCY_MS).record(latency_ms);
}

/// Mirror the derived summary fields into gauges
pub fn set_summary_gauges(summary: &Summary) {
    gauge!(LOSS_PCT).set(summary.loss_pct);
    if let Some(fps) = summary.fps {
        gauge!(FPS).set(fps);
    }
}
