//! Protocol implementation module
//!
//! This module defines the EthaNET frame format, its encoding/decoding,
//! stream framing and the sender state machine states.

pub mod codec;
pub mod frame;
pub mod scanner;
pub mod state;

pub use self::codec::FrameCodec;
pub use self::frame::{
    check_destination, checksum, decode, encode, validate_checksum, Frame, Header,
};
pub use self::scanner::{HeaderScanner, HeaderTag};
pub use self::state::SenderState;
