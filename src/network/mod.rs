//! Channel transport module
//!
//! This module moves opaque frame bytes between the MAC layer and the
//! physical layer. Filtering by destination happens above it.

mod memory;
mod stream;
mod udp;

pub use self::memory::{LossyTransport, MemoryTransport};
pub use self::stream::StreamTransport;
pub use self::udp::UdpTransport;

use std::future::Future;

use bytes::Bytes;

use crate::core::Result;

/// A pair of byte-message channels: one outbound, one inbound
///
/// Delivery is at most once and unordered between independent publishes.
/// Failures of the channel itself surface as `Error::TransportUnavailable`.
pub trait Transport {
    /// Publishes one frame on the outbound channel
    fn publish(&mut self, frame: Bytes) -> impl Future<Output = Result<()>> + Send;

    /// Waits for the next message on the inbound channel
    fn recv(&mut self) -> impl Future<Output = Result<Bytes>> + Send;
}
