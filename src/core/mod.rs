//! Core types and constants for the EthaNET MAC layer
//!
//! This module contains the fundamental building blocks used throughout the library.

pub mod error;
pub mod types;
pub mod serde;

use std::time::Duration;

pub use self::error::{Error, Result};
pub use self::types::{
    Address,
    SequenceNumber,
    SessionConfig,
};

/// Size of the fixed frame header in bytes
pub const HEADER_SIZE: usize = 6;

/// Largest payload a single frame can carry
pub const MAX_PAYLOAD_SIZE: usize = 255;

/// Largest frame on the wire (header plus payload)
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE;

/// Payload carried by acknowledgment frames
pub const ACK_PAYLOAD: &[u8] = b"ACK";

/// Cap on the backoff exponent
pub const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Default bounded wait for an acknowledgment
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(50);

/// Default wait for inbound data on the receive path
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Placeholder frame transmission time used by the constant frame timer
pub const DEFAULT_FRAME_TIME: Duration = Duration::from_millis(10);

/// Longest accepted ACK wait per attempt
pub const MAX_ACK_TIMEOUT: Duration = Duration::from_secs(3600);

/// Longest accepted constant frame time
pub const MAX_FRAME_TIME: Duration = Duration::from_secs(60);

/// Default chunk size for outbound messages
pub const DEFAULT_MTU: u8 = 32;

/// Default endpoint frames are published to
pub const DEFAULT_TRANSMIT_ENDPOINT: &str = "127.0.0.1:5555";

/// Default endpoint frames are received on
pub const DEFAULT_RECEIVE_ENDPOINT: &str = "127.0.0.1:5556";
