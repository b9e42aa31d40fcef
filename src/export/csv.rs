//! CSV exports: run summary, latency histogram, benchmark sweep

use std::fmt::Write as _;
use std::path::Path;

use crate::export::error::{write_file, ExportResult};
use crate::stats::{LatencyHistogram, Summary};
use crate::stream::BenchResult;

/// Header row plus one value row; absent values become empty cells
pub fn format_summary(summary: &Summary) -> String {
    let fields = summary.fields();
    let header: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
    let values: Vec<String> = fields
        .into_iter()
        .map(|(_, value)| value.unwrap_or_default())
        .collect();

    format!("{}\n{}\n", header.join(","), values.join(","))
}

/// `latency_ms,count` rows in edge order, then `over,<n>`
pub fn format_histogram(histogram: &LatencyHistogram) -> String {
    let mut out = String::from("latency_ms,count\n");
    for bucket in &histogram.buckets {
        let _ = writeln!(out, "{},{}", bucket.upper_ms, bucket.count);
    }
    let _ = writeln!(out, "over,{}", histogram.over);
    out
}

/// One row per benchmark case: `kind,codec,hz` then the summary columns
pub fn format_bench(results: &[BenchResult]) -> String {
    let mut out = format!("kind,codec,hz,{}\n", Summary::FIELDS.join(","));
    for result in results {
        let values: Vec<String> = result
            .summary
            .fields()
            .into_iter()
            .map(|(_, value)| value.unwrap_or_default())
            .collect();
        let _ = writeln!(
            out,
            "{},{},{},{}",
            result.case.kind,
            result.case.codec,
            result.case.rate_hz,
            values.join(",")
        );
    }
    out
}

pub fn write_summary(summary: &Summary, path: impl AsRef<Path>) -> ExportResult<()> {
    write_file(path.as_ref(), &format_summary(summary))
}

pub fn write_histogram(histogram: &LatencyHistogram, path: impl AsRef<Path>) -> ExportResult<()> {
    write_file(path.as_ref(), &format_histogram(histogram))
}

pub fn write_bench(results: &[BenchResult], path: impl AsRef<Path>) -> ExportResult<()> {
    write_file(path.as_ref(), &format_bench(results))
}
