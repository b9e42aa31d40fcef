//! Producer/consumer stream pipeline
//!
//! The producer paces synthetic frames onto a bus at a target rate; the
//! consumer drains the other end and records latency. Both share one
//! [`StreamStats`](crate::stats::StreamStats).

pub mod bench;
pub mod consumer;
pub mod error;
pub mod producer;
pub mod runner;

pub use bench::{bench_cases, run_bench, BenchCase, BenchResult, DEFAULT_BENCH_RATES_HZ};
pub use consumer::{Consumer, POLL_TIMEOUT};
pub use error::{StreamError, StreamResult};
pub use producer::{Producer, ProducerConfig, ProducerReport, DEFAULT_DURATION, DEFAULT_RATE_HZ};
pub use runner::{spawn_observer, RunConfig, RunOutcome, StreamRunner};
