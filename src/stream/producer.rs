//! Rate-paced frame producer
//!
//! Tick `i` is scheduled at `t0 + i / rate`, anchored to the loop start, so a
//! slow tick delays only itself and never shifts the ticks after it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

use crate::bus::{BusPtr, Packet};
use crate::frame::{Codec, Encoder, FrameSource, SignalKind, DEFAULT_QUALITY};
use crate::metrics::record_packet_sent;
use crate::stats::StreamStats;
use crate::stream::error::{StreamError, StreamResult};

pub const DEFAULT_RATE_HZ: f64 = 30.0;
pub const DEFAULT_DURATION: Duration = Duration::from_secs(10);

/// What to produce and how fast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub kind: SignalKind,
    pub codec: Codec,
    /// Encoder quality, clamped to 1-100
    pub quality: u32,
    /// Frame size; `None` uses the kind's default
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub rate_hz: f64,
    pub duration: Duration,
    /// Percentage of encoded frames discarded before publishing
    pub publish_drop_pct: f64,
    pub seed: Option<u64>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            kind: SignalKind::Rgb,
            codec: Codec::Lz4,
            quality: DEFAULT_QUALITY,
            width: None,
            height: None,
            rate_hz: DEFAULT_RATE_HZ,
            duration: DEFAULT_DURATION,
            publish_drop_pct: 0.0,
            seed: None,
        }
    }
}

impl ProducerConfig {
    pub fn new(kind: SignalKind, codec: Codec) -> Self {
        Self {
            kind,
            codec,
            ..Default::default()
        }
    }

    pub fn with_rate(mut self, rate_hz: f64) -> Self {
        self.rate_hz = rate_hz;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_dimensions(mut self, width: usize, height: usize) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_publish_drop(mut self, pct: f64) -> Self {
        self.publish_drop_pct = pct;
        self
    }

    /// Check the rate and build the frame source and encoder
    pub fn build(&self) -> StreamResult<(FrameSource, Encoder)> {
        if !self.rate_hz.is_finite() || self.rate_hz <= 0.0 {
            return Err(StreamError::InvalidRate(self.rate_hz));
        }
        if self.publish_drop_pct.is_nan() {
            return Err(StreamError::Config(
                "publish drop percentage is not a number".to_string(),
            ));
        }

        let (default_w, default_h) = self.kind.default_dimensions();
        let source = FrameSource::new(
            self.kind,
            self.width.unwrap_or(default_w),
            self.height.unwrap_or(default_h),
        )?;
        let encoder = Encoder::new(self.kind, self.codec, self.quality)?;
        Ok((source, encoder))
    }

    /// Number of ticks a full run emits, `ceil(duration * rate)`
    pub fn expected_ticks(&self) -> u64 {
        (self.duration.as_secs_f64() * self.rate_hz).ceil().max(0.0) as u64
    }
}

/// Counters for one producer run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerReport {
    pub ticks: u64,
    pub published: u64,
    pub dropped: u64,
}

pub struct Producer {
    bus: BusPtr,
    stats: Arc<StreamStats>,
    source: FrameSource,
    encoder: Encoder,
    rate_hz: f64,
    duration: Duration,
    drop_probability: f64,
    rng: StdRng,
}

impl Producer {
    pub fn new(bus: BusPtr, stats: Arc<StreamStats>, config: &ProducerConfig) -> StreamResult<Self> {
        let (source, encoder) = config.build()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            bus,
            stats,
            source,
            encoder,
            rate_hz: config.rate_hz,
            duration: config.duration,
            drop_probability: (config.publish_drop_pct / 100.0).clamp(0.0, 1.0),
            rng,
        })
    }

    /// Emit frames until the run deadline
    ///
    /// Stops at whichever comes first: the next ideal tick falling at or after
    /// the deadline, or the clock passing it. A producer that falls behind its
    /// rate therefore never bursts its backlog after the run is over.
    /// An encoding failure aborts the run; bus overflow and publish-side drops
    /// only show up in the statistics.
    pub async fn run(mut self) -> StreamResult<ProducerReport> {
        let kind = self.source.kind().as_str();
        let t0 = Instant::now();
        // `None`: the duration does not fit on the clock, so no deadline
        let deadline = t0.checked_add(self.duration);
        let past_deadline = |instant: Instant| deadline.is_some_and(|deadline| instant >= deadline);
        let mut report = ProducerReport::default();

        loop {
            let now = Instant::now();
            if past_deadline(now) {
                break;
            }
            // An offset beyond what `Duration`/`Instant` can hold is past any deadline
            let Some(ideal) = Duration::try_from_secs_f64(report.ticks as f64 / self.rate_hz)
                .ok()
                .and_then(|offset| t0.checked_add(offset))
            else {
                break;
            };
            if past_deadline(ideal) {
                break;
            }
            if ideal > now {
                sleep_until(ideal).await;
                if past_deadline(Instant::now()) {
                    break;
                }
            }

            let frame = self.source.frame(report.ticks);
            report.ticks += 1;
            let payload = self.encoder.encode(&frame)?;

            if self.drop_probability > 0.0 && self.rng.gen_bool(self.drop_probability) {
                report.dropped += 1;
                continue;
            }

            let nbytes = payload.len();
            self.bus.publish(Packet::stamped(payload))?;
            self.stats.record_tx(nbytes);
            record_packet_sent(kind, nbytes);
            report.published += 1;
        }

        tracing::debug!(
            "Producer finished: ticks={} published={} dropped={}",
            report.ticks,
            report.published,
            report.dropped
        );
        Ok(report)
    }
}
