//! Command-line arguments

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use streambench::bus::{BusConfig, BusKind, ImpairmentConfig, DEFAULT_CAPACITY, DEFAULT_ENDPOINT};
use streambench::frame::{Codec, SignalKind, DEFAULT_QUALITY};
use streambench::stream::ProducerConfig;

/// Synthetic sensor stream benchmark.
#[derive(Parser, Debug)]
#[command(name = "streambench", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Producer and consumer in one process
    Run(RunArgs),
    /// Producer only, on a TCP publisher endpoint
    Publish(PublishArgs),
    /// Consumer only, on a TCP subscriber endpoint
    Subscribe(SubscribeArgs),
    /// Sweep every codec strategy across several rates
    Bench(BenchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SignalArgs {
    /// Signal kind: rgb or tof
    #[arg(long, default_value = "rgb")]
    pub kind: SignalKind,

    /// Codec; defaults to lz4 for rgb and zstd16 for tof
    #[arg(long)]
    pub codec: Option<Codec>,

    /// Encoder quality, 1-100
    #[arg(long, default_value_t = DEFAULT_QUALITY)]
    pub quality: u32,

    #[arg(long)]
    pub width: Option<usize>,

    #[arg(long)]
    pub height: Option<usize>,

    /// Percentage of frames discarded before publishing
    #[arg(long, default_value_t = 0.0)]
    pub publish_drop_pct: f64,
}

#[derive(Args, Debug, Clone)]
pub struct ImpairArgs {
    /// Impairment preset: perfect, lan, wifi, 4g, disaster
    #[arg(long)]
    pub preset: Option<String>,

    /// Added one-way latency in milliseconds
    #[arg(long)]
    pub net_latency_ms: Option<f64>,

    /// Latency jitter standard deviation in milliseconds
    #[arg(long)]
    pub net_jitter_ms: Option<f64>,

    /// Percentage of packets dropped on receive
    #[arg(long)]
    pub drop_pct_rx: Option<f64>,

    /// Seed for drop and jitter sampling
    #[arg(long, env = "STREAMBENCH_SEED")]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Summary CSV
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Summary in Prometheus text format
    #[arg(long)]
    pub prom: Option<PathBuf>,

    /// Latency histogram CSV
    #[arg(long)]
    pub hist_csv: Option<PathBuf>,

    /// Latency histogram in Prometheus text format
    #[arg(long)]
    pub hist_prom: Option<PathBuf>,

    /// Summary JSON
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct BusArgs {
    /// Bus kind: memory or tcp
    #[arg(long, default_value = "memory")]
    pub bus: BusKind,

    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Queue capacity in packets, per subscriber on a TCP publisher
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub signal: SignalArgs,

    /// Target frame rate
    #[arg(long, default_value_t = 30.0)]
    pub hz: f64,

    /// Run duration in seconds
    #[arg(long, default_value_t = 10.0)]
    pub seconds: f64,

    #[command(flatten)]
    pub bus: BusArgs,

    #[command(flatten)]
    pub impair: ImpairArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Log a live summary at this period
    #[arg(long)]
    pub live_interval_ms: Option<u64>,

    /// Serve live Prometheus metrics on this address
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    #[command(flatten)]
    pub signal: SignalArgs,

    #[arg(long, default_value_t = 30.0)]
    pub hz: f64,

    #[arg(long, default_value_t = 10.0)]
    pub seconds: f64,

    /// Address to bind
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Wait up to this long for a subscriber before publishing
    #[arg(long, default_value_t = 0)]
    pub wait_subscriber_ms: u64,

    /// Frames queued per subscriber before the oldest is dropped
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,

    /// Seed for publish drop sampling
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

#[derive(Args, Debug)]
pub struct SubscribeArgs {
    /// Publisher address to connect to
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    #[arg(long, default_value_t = 10.0)]
    pub seconds: f64,

    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,

    #[command(flatten)]
    pub impair: ImpairArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    #[arg(long)]
    pub live_interval_ms: Option<u64>,

    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Duration of each case in seconds
    #[arg(long, default_value_t = 5.0)]
    pub seconds: f64,

    /// Rates to sweep
    #[arg(long, value_delimiter = ',', default_values_t = [10.0, 20.0, 30.0, 60.0])]
    pub rates: Vec<f64>,

    #[arg(long, default_value_t = DEFAULT_QUALITY)]
    pub quality: u32,

    #[arg(long)]
    pub width: Option<usize>,

    #[arg(long)]
    pub height: Option<usize>,

    #[command(flatten)]
    pub bus: BusArgs,

    #[command(flatten)]
    pub impair: ImpairArgs,

    /// Output CSV, one row per case
    #[arg(long, default_value = "bench.csv")]
    pub out: PathBuf,
}

/// Seconds from the command line as a `Duration`
pub fn parse_seconds(seconds: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| anyhow::anyhow!("invalid duration: {} seconds", seconds))
}

impl SignalArgs {
    pub fn producer_config(&self, hz: f64, duration: Duration) -> ProducerConfig {
        ProducerConfig {
            kind: self.kind,
            codec: self.codec.unwrap_or_else(|| Codec::default_for(self.kind)),
            quality: self.quality,
            width: self.width,
            height: self.height,
            rate_hz: hz,
            duration,
            publish_drop_pct: self.publish_drop_pct,
            seed: None,
        }
    }
}

impl ImpairArgs {
    /// Preset (or none) with explicit flags layered on top
    pub fn impairment(&self) -> anyhow::Result<ImpairmentConfig> {
        let mut impairment = match &self.preset {
            Some(name) => ImpairmentConfig::preset(name)
                .ok_or_else(|| anyhow::anyhow!("unknown impairment preset: {}", name))?,
            None => ImpairmentConfig::default(),
        };

        if let Some(latency) = self.net_latency_ms {
            impairment.net_latency_ms = latency;
        }
        if let Some(jitter) = self.net_jitter_ms {
            impairment.net_jitter_ms = jitter;
        }
        if let Some(drop) = self.drop_pct_rx {
            impairment.drop_pct_rx = drop;
        }
        if self.seed.is_some() {
            impairment.seed = self.seed;
        }
        Ok(impairment)
    }
}

impl BusArgs {
    pub fn bus_config(&self, impairment: ImpairmentConfig) -> BusConfig {
        BusConfig {
            kind: self.bus,
            endpoint: self.endpoint.clone(),
            capacity: self.capacity,
            impairment,
        }
    }
}
