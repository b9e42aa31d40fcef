//! File exports of run results
//!
//! - CSV: summary, latency histogram, benchmark sweep
//! - Prometheus text: summary gauges and cumulative latency buckets
//! - JSON: summary

pub mod csv;
pub mod error;
pub mod json;
pub mod prometheus;

pub use error::{ExportError, ExportResult};
