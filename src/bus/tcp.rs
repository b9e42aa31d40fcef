//! TCP transport for running the producer and consumer in separate processes
//!
//! The role is fixed when the bus is built: a publisher binds and fans every
//! message out to all connected subscribers, a subscriber connects and buffers
//! incoming messages in a bounded [`MemoryBus`]. Calling the other role's
//! operation is a [`BusError::RoleViolation`].
//!
//! Each subscriber of a publisher gets its own bounded queue and writer task.
//! A peer that stops reading only loses its own oldest frames, and is dropped
//! once a single write stalls for [`WRITE_TIMEOUT`].

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::bus::error::{BusError, BusResult};
use crate::bus::memory::MemoryBus;
use crate::bus::types::{Bus, Packet, Role};
use crate::bus::wire::{check_part_len, decode_message, encode_message};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Longest a single frame write may block before the subscriber is dropped
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// How often an idle writer checks whether its publisher is gone
const CLOSE_POLL: Duration = Duration::from_millis(50);

struct Peer {
    queue: Arc<MemoryBus>,
    done: Arc<AtomicBool>,
}

/// State shared by a publisher handle, its accept task and its writers
struct Fanout {
    peers: Mutex<Vec<Peer>>,
    capacity: usize,
    closed: AtomicBool,
}

impl Fanout {
    fn live_peers(&self) -> usize {
        let mut peers = self.peers.lock();
        peers.retain(|peer| !peer.done.load(Ordering::Acquire));
        peers.len()
    }
}

enum Endpoint {
    Publisher {
        fanout: Arc<Fanout>,
        local_addr: SocketAddr,
    },
    Subscriber {
        queue: Arc<MemoryBus>,
    },
}

pub struct TcpBus {
    role: Role,
    endpoint: Endpoint,
    tasks: Vec<JoinHandle<()>>,
}

/// Accept `host:port` as well as a `tcp://host:port` URL
pub fn normalize_endpoint(endpoint: &str) -> BusResult<&str> {
    let address = endpoint.trim();
    let address = address.strip_prefix("tcp://").unwrap_or(address);
    if address.is_empty() {
        return Err(BusError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "empty address".to_string(),
        });
    }
    Ok(address)
}

impl TcpBus {
    /// Build an endpoint for `role`; `capacity` bounds every per-connection buffer
    pub async fn new(endpoint: &str, role: Role, capacity: usize) -> BusResult<Self> {
        match role {
            Role::Publisher => Self::bind(endpoint, capacity).await,
            Role::Subscriber => Self::connect(endpoint, capacity).await,
        }
    }

    /// Bind a publisher on `endpoint`, queueing at most `capacity` frames per subscriber
    pub async fn bind(endpoint: &str, capacity: usize) -> BusResult<Self> {
        let address = normalize_endpoint(endpoint)?;
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| BusError::Bind {
                endpoint: endpoint.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let fanout = Arc::new(Fanout {
            peers: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        });
        let accept_task = tokio::spawn(accept_loop(listener, fanout.clone()));

        tracing::info!("TCP publisher bound on {}", local_addr);

        Ok(Self {
            role: Role::Publisher,
            endpoint: Endpoint::Publisher { fanout, local_addr },
            tasks: vec![accept_task],
        })
    }

    /// Connect a subscriber to a publisher at `endpoint`
    pub async fn connect(endpoint: &str, capacity: usize) -> BusResult<Self> {
        let address = normalize_endpoint(endpoint)?;
        let stream = TcpStream::connect(address)
            .await
            .map_err(|source| BusError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;

        let queue = Arc::new(MemoryBus::new(capacity));
        let reader_task = tokio::spawn(read_loop(stream, peer, queue.clone()));

        tracing::info!("TCP subscriber connected to {}", peer);

        Ok(Self {
            role: Role::Subscriber,
            endpoint: Endpoint::Subscriber { queue },
            tasks: vec![reader_task],
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Bound address of a publisher
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.endpoint {
            Endpoint::Publisher { local_addr, .. } => Some(*local_addr),
            Endpoint::Subscriber { .. } => None,
        }
    }

    /// Number of subscribers currently receiving from this publisher
    pub fn subscriber_count(&self) -> usize {
        match &self.endpoint {
            Endpoint::Publisher { fanout, .. } => fanout.live_peers(),
            Endpoint::Subscriber { .. } => 0,
        }
    }

    /// Wait until at least `count` subscribers are attached
    ///
    /// Messages published before a subscriber attaches are not delivered to
    /// it, so in-process runs settle here before the producer starts.
    pub async fn wait_for_subscribers(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if self.subscriber_count() >= count {
                return true;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl Drop for TcpBus {
    fn drop(&mut self) {
        // Writers flush what is already queued, then exit
        if let Endpoint::Publisher { fanout, .. } = &self.endpoint {
            fanout.closed.store(true, Ordering::Release);
        }
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[async_trait]
impl Bus for TcpBus {
    fn publish(&self, packet: Packet) -> BusResult<()> {
        match &self.endpoint {
            Endpoint::Publisher { fanout, .. } => {
                check_part_len(packet.payload.len())?;
                // No subscriber means the frame is gone, as with any PUB socket
                let mut peers = fanout.peers.lock();
                peers.retain(|peer| !peer.done.load(Ordering::Acquire));
                for peer in peers.iter() {
                    peer.queue.push(packet.clone());
                }
                Ok(())
            }
            Endpoint::Subscriber { .. } => Err(BusError::RoleViolation {
                operation: "publish",
                role: self.role,
            }),
        }
    }

    async fn subscribe(&self, timeout: Option<Duration>) -> BusResult<Option<Packet>> {
        match &self.endpoint {
            Endpoint::Subscriber { queue } => Ok(queue.pop(timeout).await),
            Endpoint::Publisher { .. } => Err(BusError::RoleViolation {
                operation: "subscribe",
                role: self.role,
            }),
        }
    }
}

async fn accept_loop(listener: TcpListener, fanout: Arc<Fanout>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::warn!("Failed to set TCP_NODELAY for {}: {}", peer, e);
                }

                let queue = Arc::new(MemoryBus::new(fanout.capacity));
                let done = Arc::new(AtomicBool::new(false));
                fanout.peers.lock().push(Peer {
                    queue: queue.clone(),
                    done: done.clone(),
                });
                tokio::spawn(write_loop(stream, peer, queue, done, fanout.clone()));
            }
            Err(e) => {
                tracing::warn!("Failed to accept subscriber: {}", e);
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
}

async fn write_loop(
    mut stream: TcpStream,
    peer: SocketAddr,
    queue: Arc<MemoryBus>,
    done: Arc<AtomicBool>,
    fanout: Arc<Fanout>,
) {
    tracing::debug!("Subscriber {} attached", peer);

    loop {
        let Some(packet) = queue.pop(Some(CLOSE_POLL)).await else {
            if fanout.closed.load(Ordering::Acquire) {
                let _ = stream.shutdown().await;
                break;
            }
            continue;
        };

        let frame = match encode_message(&packet) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Skipping frame for {}: {}", peer, e);
                continue;
            }
        };
        match tokio::time::timeout(WRITE_TIMEOUT, stream.write_all(&frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!("Dropping subscriber {}: {}", peer, e);
                break;
            }
            Err(_) => {
                tracing::warn!(
                    "Dropping subscriber {}: write stalled for {:?}",
                    peer,
                    WRITE_TIMEOUT
                );
                break;
            }
        }
    }

    if queue.evicted() > 0 {
        tracing::debug!(
            "Subscriber {} lost {} frames to a full queue",
            peer,
            queue.evicted()
        );
    }
    done.store(true, Ordering::Release);
}

async fn read_loop(mut stream: TcpStream, peer: SocketAddr, queue: Arc<MemoryBus>) {
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);

    loop {
        match stream.read_buf(&mut buf).await {
            Ok(0) => {
                tracing::debug!("Publisher {} closed the connection", peer);
                return;
            }
            Ok(_) => loop {
                match decode_message(&mut buf) {
                    Ok(Some(packet)) => queue.push(packet),
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Dropping connection to {}: {}", peer, e);
                        return;
                    }
                }
            },
            Err(e) => {
                tracing::warn!("Read from {} failed: {}", peer, e);
                return;
            }
        }
    }
}
