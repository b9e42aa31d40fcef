//! Deadline-bounded consumer: drains the bus and records one-way latency

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::bus::{now_ns, BusPtr, Packet};
use crate::metrics::record_packet_received;
use crate::stats::StreamStats;
use crate::stream::error::StreamResult;

/// Longest single wait on the bus; bounds how late the loop notices its deadline
pub const POLL_TIMEOUT: Duration = Duration::from_millis(200);

pub struct Consumer {
    bus: BusPtr,
    stats: Arc<StreamStats>,
    duration: Duration,
    poll_timeout: Duration,
}

impl Consumer {
    pub fn new(bus: BusPtr, stats: Arc<StreamStats>, duration: Duration) -> Self {
        Self {
            bus,
            stats,
            duration,
            poll_timeout: POLL_TIMEOUT,
        }
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    fn record(&self, packet: &Packet) {
        let now = now_ns();
        // Signed: clocks on two hosts may disagree
        let latency_ms = (now as i128 - packet.send_timestamp_ns as i128) as f64 / 1e6;
        self.stats.record_rx(latency_ms, Some(now as f64 / 1e6));
        record_packet_received(latency_ms);
    }

    /// Receive until `duration` has elapsed; returns the number of packets taken
    pub async fn run(self) -> StreamResult<u64> {
        let deadline = Instant::now().checked_add(self.duration);
        let mut received = 0u64;

        while deadline.map_or(true, |deadline| Instant::now() < deadline) {
            if let Some(packet) = self.bus.subscribe(Some(self.poll_timeout)).await? {
                self.record(&packet);
                received += 1;
            }
        }

        tracing::debug!("Consumer finished: received={}", received);
        Ok(received)
    }
}
