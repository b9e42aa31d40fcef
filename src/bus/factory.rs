use std::sync::Arc;
use std::time::Duration;

use crate::bus::error::BusResult;
use crate::bus::impair::ImpairedBus;
use crate::bus::memory::MemoryBus;
use crate::bus::tcp::TcpBus;
use crate::bus::types::{BusConfig, BusKind, BusPtr, ImpairmentConfig, Role};

/// How long an in-process TCP pair waits for its subscriber to attach
const SUBSCRIBER_SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Publisher and subscriber handles for a single in-process run.
///
/// For the memory bus both sides share one queue.
#[derive(Clone)]
pub struct BusPair {
    pub publisher: BusPtr,
    pub subscriber: BusPtr,
}

fn wrap(base: BusPtr, impairment: &ImpairmentConfig) -> BusPtr {
    if impairment.is_active() {
        tracing::info!(
            "Impairment enabled: latency={}ms jitter={}ms drop={}%",
            impairment.net_latency_ms,
            impairment.net_jitter_ms,
            impairment.drop_pct_rx
        );
        Arc::new(ImpairedBus::new(base, impairment))
    } else {
        base
    }
}

/// Build one bus endpoint for `role`.
///
/// Transport failures (bind, connect) are configuration errors and are
/// returned as-is; there is no silent fallback to the memory bus.
pub async fn make_bus(config: &BusConfig, role: Role) -> BusResult<BusPtr> {
    let base: BusPtr = match config.kind {
        BusKind::Memory => Arc::new(MemoryBus::new(config.capacity)),
        BusKind::Tcp => Arc::new(TcpBus::new(&config.endpoint, role, config.capacity).await?),
    };

    Ok(wrap(base, &config.impairment))
}

/// Build a connected publisher/subscriber pair for an in-process run.
pub async fn make_bus_pair(config: &BusConfig) -> BusResult<BusPair> {
    match config.kind {
        BusKind::Memory => {
            let base: BusPtr = Arc::new(MemoryBus::new(config.capacity));
            Ok(BusPair {
                publisher: base.clone(),
                subscriber: wrap(base, &config.impairment),
            })
        }
        BusKind::Tcp => {
            let publisher = TcpBus::bind(&config.endpoint, config.capacity).await?;
            let bound = publisher
                .local_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|| config.endpoint.clone());
            let subscriber = TcpBus::connect(&bound, config.capacity).await?;

            if !publisher
                .wait_for_subscribers(1, SUBSCRIBER_SETTLE_TIMEOUT)
                .await
            {
                tracing::warn!(
                    "Subscriber did not attach to {} within {:?}; early packets may be lost",
                    bound,
                    SUBSCRIBER_SETTLE_TIMEOUT
                );
            }

            Ok(BusPair {
                publisher: Arc::new(publisher),
                subscriber: wrap(Arc::new(subscriber), &config.impairment),
            })
        }
    }
}
