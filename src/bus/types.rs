use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::bus::error::{BusError, BusResult};

/// Default number of packets a bounded bus holds before evicting.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Default endpoint for the TCP transport.
pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:5556";

/// One transmitted payload plus the wall-clock time it was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub send_timestamp_ns: u64,
    pub payload: Bytes,
}

impl Packet {
    pub fn new(send_timestamp_ns: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            send_timestamp_ns,
            payload: payload.into(),
        }
    }

    /// Stamp `payload` with the current wall-clock time.
    pub fn stamped(payload: impl Into<Bytes>) -> Self {
        Self::new(now_ns(), payload)
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Wall-clock nanoseconds since the Unix epoch.
///
/// Wall time rather than a monotonic clock so timestamps stay comparable
/// between a publisher and a subscriber running in different processes.
pub fn now_ns() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .map(|ns| ns.max(0) as u64)
        .unwrap_or_default()
}

/// Publish/subscribe transport with bounded buffering.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Hand a packet to the bus. Never blocks; overflow is absorbed by the bus.
    fn publish(&self, packet: Packet) -> BusResult<()>;

    /// Wait up to `timeout` for the oldest available packet.
    ///
    /// `None` waits indefinitely. `Ok(None)` is a normal timeout, not an error.
    async fn subscribe(&self, timeout: Option<Duration>) -> BusResult<Option<Packet>>;
}

pub type BusPtr = Arc<dyn Bus>;

/// Which side of a transport an endpoint is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Publisher,
    Subscriber,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Publisher => write!(f, "publisher"),
            Role::Subscriber => write!(f, "subscriber"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    /// In-process bounded queue.
    #[default]
    Memory,
    /// Length-framed TCP transport between processes.
    #[serde(alias = "external-transport")]
    Tcp,
}

impl FromStr for BusKind {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(BusKind::Memory),
            "tcp" | "external-transport" => Ok(BusKind::Tcp),
            other => Err(BusError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for BusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusKind::Memory => write!(f, "memory"),
            BusKind::Tcp => write!(f, "tcp"),
        }
    }
}

/// Receive-side network impairment applied by [`crate::bus::ImpairedBus`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpairmentConfig {
    /// Fixed one-way delay added to every delivered packet
    pub net_latency_ms: f64,
    /// Standard deviation of the gaussian jitter around the fixed delay
    pub net_jitter_ms: f64,
    /// Percentage (0-100) of received packets silently discarded
    pub drop_pct_rx: f64,
    /// RNG seed for reproducible drop/jitter sequences. `None` = entropy.
    pub seed: Option<u64>,
}

impl Default for ImpairmentConfig {
    fn default() -> Self {
        Self {
            net_latency_ms: 0.0,
            net_jitter_ms: 0.0,
            drop_pct_rx: 0.0,
            seed: None,
        }
    }
}

impl ImpairmentConfig {
    /// No impairment at all
    pub fn perfect() -> Self {
        Self::default()
    }

    /// Wired LAN: sub-millisecond delay, negligible loss
    pub fn lan() -> Self {
        Self {
            net_latency_ms: 0.5,
            net_jitter_ms: 0.2,
            drop_pct_rx: 0.1,
            ..Default::default()
        }
    }

    /// Busy WiFi
    pub fn wifi() -> Self {
        Self {
            net_latency_ms: 5.0,
            net_jitter_ms: 3.0,
            drop_pct_rx: 2.0,
            ..Default::default()
        }
    }

    /// Congested 4G/LTE uplink
    pub fn mobile_4g() -> Self {
        Self {
            net_latency_ms: 50.0,
            net_jitter_ms: 15.0,
            drop_pct_rx: 5.0,
            ..Default::default()
        }
    }

    /// Degraded field link
    pub fn disaster() -> Self {
        Self {
            net_latency_ms: 200.0,
            net_jitter_ms: 60.0,
            drop_pct_rx: 20.0,
            ..Default::default()
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "perfect" => Some(Self::perfect()),
            "lan" => Some(Self::lan()),
            "wifi" => Some(Self::wifi()),
            "mobile_4g" | "4g" => Some(Self::mobile_4g()),
            "disaster" => Some(Self::disaster()),
            _ => None,
        }
    }

    /// Whether any parameter would change delivery.
    pub fn is_active(&self) -> bool {
        self.net_latency_ms > 0.0 || self.net_jitter_ms > 0.0 || self.drop_pct_rx > 0.0
    }
}

/// Selects and wraps the bus used for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub kind: BusKind,
    /// `host:port` for the TCP transport; ignored by the memory bus
    pub endpoint: String,
    /// Bounded queue size before the oldest packet is evicted
    pub capacity: usize,
    pub impairment: ImpairmentConfig,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            kind: BusKind::Memory,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            capacity: DEFAULT_CAPACITY,
            impairment: ImpairmentConfig::default(),
        }
    }
}

impl BusConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn tcp(endpoint: impl Into<String>) -> Self {
        Self {
            kind: BusKind::Tcp,
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_impairment(mut self, impairment: ImpairmentConfig) -> Self {
        self.impairment = impairment;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}
