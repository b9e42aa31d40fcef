//! Message bus abstraction
//!
//! A [`Bus`] moves [`Packet`]s from a producer to a consumer. Implementations:
//! - [`MemoryBus`]: in-process bounded queue with overwrite-oldest overflow
//! - [`TcpBus`]: length-framed TCP transport with an explicit [`Role`]
//! - [`ImpairedBus`]: decorator adding receive-side loss, latency and jitter

pub mod error;
pub mod factory;
pub mod impair;
pub mod memory;
pub mod tcp;
pub mod types;
pub mod wire;

pub use error::{BusError, BusResult};
pub use factory::{make_bus, make_bus_pair, BusPair};
pub use impair::ImpairedBus;
pub use memory::MemoryBus;
pub use tcp::TcpBus;
pub use types::{
    now_ns, Bus, BusConfig, BusKind, BusPtr, ImpairmentConfig, Packet, Role, DEFAULT_CAPACITY,
    DEFAULT_ENDPOINT,
};
