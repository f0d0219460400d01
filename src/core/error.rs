use std::io;
use thiserror::Error;

use super::types::SequenceNumber;

/// Custom error types for EthaNET
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A single-byte field (or the payload length) is out of range
    #[error("Invalid field range: {field} = {value} (expected {min}..={max})")]
    InvalidFieldRange {
        /// Name of the offending field
        field: &'static str,
        /// Value that was supplied
        value: i64,
        /// Smallest accepted value
        min: i64,
        /// Largest accepted value
        max: i64,
    },

    #[error("Truncated header: got {len} bytes, need 6")]
    TruncatedHeader {
        /// Number of bytes available
        len: usize,
    },

    #[error("Checksum mismatch: frame carries {expected:#04x}, computed {computed:#04x}")]
    ChecksumMismatch {
        /// Checksum stored in the header
        expected: u8,
        /// Checksum recomputed from the frame contents
        computed: u8,
    },

    #[error("Length mismatch: header declares {declared} payload bytes, frame carries {actual}")]
    LengthMismatch {
        /// Payload length stored in the header
        declared: u8,
        /// Number of payload bytes actually present
        actual: usize,
    },

    #[error("No acknowledgment for sequence {0}")]
    AckTimeout(SequenceNumber),

    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Shut down while sequence {0} was in flight")]
    Cancelled(SequenceNumber),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Error::TransportUnavailable(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Creates a new field range error
    pub fn field_range(field: &'static str, value: i64, min: i64, max: i64) -> Self {
        Error::InvalidFieldRange { field, value, min, max }
    }

    /// Whether this error is part of normal lossy-channel operation
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ChecksumMismatch { .. }
                | Error::LengthMismatch { .. }
                | Error::TruncatedHeader { .. }
                | Error::AckTimeout(_)
        )
    }
}

/// Narrows `value` into a single-byte header field
pub fn byte_field(field: &'static str, value: i64) -> Result<u8> {
    u8::try_from(value).map_err(|_| Error::field_range(field, value, 0, u8::MAX as i64))
}
