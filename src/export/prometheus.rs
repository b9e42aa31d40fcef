//! Prometheus text exposition of a finished run
//!
//! Static files for the node-exporter textfile collector, as opposed to the
//! live listener in [`crate::metrics`].

use std::fmt::Write as _;
use std::path::Path;

use crate::export::error::{write_file, ExportResult};
use crate::stats::{LatencyHistogram, Summary};

const METRIC_PREFIX: &str = "stream_";

/// One gauge per present summary field
pub fn format_summary(summary: &Summary) -> String {
    let mut out = String::new();
    for (name, value) in summary.fields() {
        if let Some(value) = value {
            let metric = format!("{}{}", METRIC_PREFIX, name);
            let _ = writeln!(out, "# TYPE {} gauge", metric);
            let _ = writeln!(out, "{} {}", metric, value);
        }
    }
    out
}

/// Cumulative `stream_latency_ms_bucket` lines, `+Inf` and the sample count
pub fn format_histogram(histogram: &LatencyHistogram) -> String {
    let total = histogram.total();
    let mut out = String::new();
    for (upper_ms, cumulative) in histogram.cumulative() {
        let _ = writeln!(
            out,
            "{}latency_ms_bucket{{le=\"{}\"}} {}",
            METRIC_PREFIX, upper_ms, cumulative
        );
    }
    let _ = writeln!(out, "{}latency_ms_bucket{{le=\"+Inf\"}} {}", METRIC_PREFIX, total);
    let _ = writeln!(out, "{}latency_ms_count {}", METRIC_PREFIX, total);
    out
}

pub fn write_summary(summary: &Summary, path: impl AsRef<Path>) -> ExportResult<()> {
    write_file(path.as_ref(), &format_summary(summary))
}

pub fn write_histogram(histogram: &LatencyHistogram, path: impl AsRef<Path>) -> ExportResult<()> {
    write_file(path.as_ref(), &format_histogram(histogram))
}
