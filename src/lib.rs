//! EthaNET: a minimal link-layer MAC protocol
//!
//! Frames carry a six-byte header (MCS, length, sequence, destination,
//! source, additive checksum) followed by up to 255 payload bytes. Senders
//! use stop-and-wait with ALOHA exponential backoff; receivers validate,
//! filter by destination and acknowledge.
pub mod core;
pub mod mac;
pub mod network;
pub mod protocol;
pub mod util;

// Re-export commonly used items
pub use core::{Address, Error, Result, SequenceNumber, SessionConfig};
pub use mac::{Delivery, SendReport, Session, SessionStats};
pub use network::Transport;
pub use protocol::Frame;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
