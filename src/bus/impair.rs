//! Receive-side network impairment decorator
//!
//! Wraps any [`Bus`] and, on every delivered packet, rolls for a drop and then
//! holds the packet for `latency + N(0, jitter)` milliseconds. Publishing is
//! untouched, so a dropped packet is only visible as a tx/rx mismatch.

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::bus::error::BusResult;
use crate::bus::types::{Bus, BusPtr, ImpairmentConfig, Packet};

pub struct ImpairedBus {
    inner: BusPtr,
    latency_ms: f64,
    drop_probability: f64,
    jitter: Option<Normal<f64>>,
    rng: Mutex<StdRng>,
    dropped: AtomicU64,
}

impl ImpairedBus {
    pub fn new(inner: BusPtr, config: &ImpairmentConfig) -> Self {
        let latency_ms = non_negative(config.net_latency_ms);
        let jitter_ms = non_negative(config.net_jitter_ms);
        let drop_pct = non_negative(config.drop_pct_rx).min(100.0);

        // Finite, non-negative std dev always builds; zero disables sampling.
        let jitter = if jitter_ms > 0.0 {
            Normal::new(0.0, jitter_ms).ok()
        } else {
            None
        };

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            inner,
            latency_ms,
            drop_probability: drop_pct / 100.0,
            jitter,
            rng: Mutex::new(rng),
            dropped: AtomicU64::new(0),
        }
    }

    /// Packets discarded by the simulated receive-side loss
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Roll for loss; `None` means drop, otherwise the delay to apply
    fn roll(&self) -> Option<Duration> {
        let mut rng = self.rng.lock();

        if self.drop_probability > 0.0 && rng.gen::<f64>() < self.drop_probability {
            return None;
        }

        let jitter = self
            .jitter
            .as_ref()
            .map(|normal| normal.sample(&mut *rng))
            .unwrap_or(0.0);
        let delay_ms = (self.latency_ms + jitter).max(0.0);

        // Saturates rather than panics for delays beyond `Duration::MAX`
        Some(Duration::try_from_secs_f64(delay_ms / 1000.0).unwrap_or(Duration::MAX))
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

#[async_trait]
impl Bus for ImpairedBus {
    fn publish(&self, packet: Packet) -> BusResult<()> {
        self.inner.publish(packet)
    }

    async fn subscribe(&self, timeout: Option<Duration>) -> BusResult<Option<Packet>> {
        let Some(packet) = self.inner.subscribe(timeout).await? else {
            return Ok(None);
        };

        match self.roll() {
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Some(delay) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(Some(packet))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::memory::MemoryBus;
    use std::sync::Arc;

    fn impaired(config: ImpairmentConfig) -> (Arc<MemoryBus>, ImpairedBus) {
        let inner = Arc::new(MemoryBus::new(1024));
        let bus = ImpairedBus::new(inner.clone(), &config);
        (inner, bus)
    }

    #[tokio::test]
    async fn test_transparent_when_unimpaired() {
        let (_, bus) = impaired(ImpairmentConfig::perfect());

        let packet = Packet::new(123, vec![9u8; 16]);
        bus.publish(packet.clone()).unwrap();

        let start = std::time::Instant::now();
        let received = bus.subscribe(Some(Duration::ZERO)).await.unwrap();
        assert_eq!(received, Some(packet));
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_total_loss() {
        let (inner, bus) = impaired(ImpairmentConfig {
            drop_pct_rx: 100.0,
            ..Default::default()
        });

        for seq in 0..50 {
            bus.publish(Packet::new(seq, vec![0u8])).unwrap();
        }
        for _ in 0..50 {
            assert!(bus.subscribe(Some(Duration::ZERO)).await.unwrap().is_none());
        }

        // Drops happen after the inner receive, so the queue is drained
        assert!(inner.is_empty());
        assert_eq!(bus.dropped(), 50);
    }

    #[tokio::test]
    async fn test_absent_inner_is_not_a_drop() {
        let (_, bus) = impaired(ImpairmentConfig {
            drop_pct_rx: 100.0,
            ..Default::default()
        });

        assert!(bus.subscribe(Some(Duration::ZERO)).await.unwrap().is_none());
        assert_eq!(bus.dropped(), 0);
    }

    #[tokio::test]
    async fn test_partial_loss() {
        let (_, bus) = impaired(ImpairmentConfig {
            drop_pct_rx: 50.0,
            seed: Some(7),
            ..Default::default()
        });

        let total = 1000;
        for seq in 0..total {
            bus.publish(Packet::new(seq, vec![0u8])).unwrap();
        }

        let mut delivered = 0;
        for _ in 0..total {
            if bus.subscribe(Some(Duration::ZERO)).await.unwrap().is_some() {
                delivered += 1;
            }
        }

        let rate = delivered as f64 / total as f64;
        assert!(rate > 0.4 && rate < 0.6, "delivery rate {rate}");
        assert_eq!(bus.dropped() + delivered, total);
    }

    #[tokio::test]
    async fn test_fixed_latency_is_applied() {
        let (_, bus) = impaired(ImpairmentConfig {
            net_latency_ms: 40.0,
            ..Default::default()
        });

        bus.publish(Packet::new(1, vec![1u8])).unwrap();

        let start = std::time::Instant::now();
        let received = bus.subscribe(Some(Duration::ZERO)).await.unwrap();
        assert!(received.is_some());
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_negative_parameters_are_clamped() {
        let inner: BusPtr = Arc::new(MemoryBus::new(4));
        let bus = ImpairedBus::new(
            inner,
            &ImpairmentConfig {
                net_latency_ms: -5.0,
                net_jitter_ms: -1.0,
                drop_pct_rx: 250.0,
                seed: Some(1),
            },
        );

        assert_eq!(bus.latency_ms, 0.0);
        assert!(bus.jitter.is_none());
        assert_eq!(bus.drop_probability, 1.0);
    }

    #[test]
    fn test_seeded_rolls_are_reproducible() {
        let config = ImpairmentConfig {
            net_latency_ms: 10.0,
            net_jitter_ms: 5.0,
            drop_pct_rx: 30.0,
            seed: Some(42),
        };
        let a = ImpairedBus::new(Arc::new(MemoryBus::new(4)), &config);
        let b = ImpairedBus::new(Arc::new(MemoryBus::new(4)), &config);

        let rolls_a: Vec<_> = (0..32).map(|_| a.roll()).collect();
        let rolls_b: Vec<_> = (0..32).map(|_| b.roll()).collect();
        assert_eq!(rolls_a, rolls_b);
    }

    #[test]
    fn test_jitter_below_zero_clamps_to_no_delay() {
        let (_, bus) = impaired(ImpairmentConfig {
            net_latency_ms: 0.0,
            net_jitter_ms: 50.0,
            seed: Some(11),
            ..Default::default()
        });

        let delays: Vec<Duration> = (0..2000)
            .map(|_| bus.roll().expect("no drop configured"))
            .collect();

        // Half the gaussian mass lies below zero and is clamped to no delay
        let clamped = delays.iter().filter(|d| d.is_zero()).count();
        assert!(
            (800..1200).contains(&clamped),
            "{} of 2000 delays clamped",
            clamped
        );
        assert!(delays.iter().any(|d| *d > Duration::from_millis(50)));
    }

    #[test]
    fn test_jitter_centres_on_latency() {
        let (_, bus) = impaired(ImpairmentConfig {
            net_latency_ms: 40.0,
            net_jitter_ms: 5.0,
            seed: Some(13),
            ..Default::default()
        });

        let samples_ms: Vec<f64> = (0..5000)
            .map(|_| bus.roll().expect("no drop configured").as_secs_f64() * 1000.0)
            .collect();
        let mean = samples_ms.iter().sum::<f64>() / samples_ms.len() as f64;

        assert!((mean - 40.0).abs() < 0.5, "mean delay {}ms", mean);
        assert!(samples_ms.iter().any(|&ms| ms < 40.0));
        assert!(samples_ms.iter().any(|&ms| ms > 40.0));
    }

    #[test]
    fn test_huge_latency_saturates() {
        let (_, bus) = impaired(ImpairmentConfig {
            net_latency_ms: 1e300,
            ..Default::default()
        });
        assert_eq!(bus.roll(), Some(Duration::MAX));
    }
}
