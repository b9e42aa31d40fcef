//! Synthetic sensor stream benchmark
//!
//! Publishes generated RGB or depth frames over a bus at a target rate,
//! optionally through simulated network impairment, and reports loss,
//! latency percentiles and frame rate.
//!
//! - [`bus`]: in-memory and TCP transports plus the impairment decorator
//! - [`frame`]: synthetic frame generators and payload encoders
//! - [`stream`]: producer, consumer, runner and benchmark sweep
//! - [`stats`]: online statistics and latency histogram
//! - [`export`]: CSV, Prometheus text and JSON files
//! - [`metrics`]: live Prometheus metrics

pub mod bus;
pub mod export;
pub mod frame;
pub mod metrics;
pub mod stats;
pub mod stream;

pub use bus::{make_bus, make_bus_pair, Bus, BusConfig, BusKind, ImpairmentConfig, Packet, Role};
pub use frame::{Codec, Encoder, FrameSource, SignalKind};
pub use stats::{StreamStats, Summary};
pub use stream::{ProducerConfig, RunConfig, StreamRunner};
