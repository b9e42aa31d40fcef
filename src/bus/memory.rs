//! In-process bounded queue bus
//!
//! Publishing never blocks: once the queue holds `capacity` packets the oldest
//! one is evicted to make room. Evictions are not errors; they surface later as
//! the tx/rx gap in the stream statistics.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};

use crate::bus::error::BusResult;
use crate::bus::types::{Bus, Packet, DEFAULT_CAPACITY};

pub struct MemoryBus {
    queue: Mutex<VecDeque<Packet>>,
    notify: Notify,
    capacity: usize,
    evicted: AtomicU64,
}

impl MemoryBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            notify: Notify::new(),
            capacity,
            evicted: AtomicU64::new(0),
        }
    }

    /// Append a packet, evicting the oldest one at capacity
    pub fn push(&self, packet: Packet) {
        {
            let mut queue = self.queue.lock();
            if queue.len() >= self.capacity {
                queue.pop_front();
                self.evicted.fetch_add(1, Ordering::Relaxed);
            }
            queue.push_back(packet);
        }
        self.notify.notify_one();
    }

    /// Take the oldest packet without waiting
    pub fn try_pop(&self) -> Option<Packet> {
        self.queue.lock().pop_front()
    }

    /// Wait for the oldest packet until `timeout` elapses (`None` = forever)
    ///
    /// A timeout too large for the clock waits forever.
    pub async fn pop(&self, timeout: Option<Duration>) -> Option<Packet> {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        loop {
            if let Some(packet) = self.try_pop() {
                return Some(packet);
            }

            // A publish between the empty check and here leaves a permit
            // in `notify`, so the wakeup is not lost.
            match deadline {
                Some(deadline) => {
                    if timeout_at(deadline, self.notify.notified()).await.is_err() {
                        return self.try_pop();
                    }
                }
                None => self.notify.notified().await,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Packets discarded because the queue was full
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl Bus for MemoryBus {
    fn publish(&self, packet: Packet) -> BusResult<()> {
        self.push(packet);
        Ok(())
    }

    async fn subscribe(&self, timeout: Option<Duration>) -> BusResult<Option<Packet>> {
        Ok(self.pop(timeout).await)
    }
}
