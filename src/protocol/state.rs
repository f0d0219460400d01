use std::fmt;
use std::time::Duration;

use crate::core::SequenceNumber;

/// Where the sender is in the send / await-ack / backoff cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderState {
    /// No frame in flight
    #[default]
    Idle,

    /// Publishing a frame on the outbound channel
    Sending {
        /// Sequence number of the frame
        sequence: SequenceNumber,
        /// Attempt number, starting at 1
        attempt: u32,
    },

    /// Waiting on the inbound channel for the matching acknowledgment
    AwaitingAck {
        /// Sequence number awaiting acknowledgment
        sequence: SequenceNumber,
        /// Attempt number, starting at 1
        attempt: u32,
    },

    /// Sleeping before a retransmission of the same frame
    BackingOff {
        /// Sequence number to retransmit
        sequence: SequenceNumber,
        /// Attempt that just timed out
        attempt: u32,
        /// Sampled backoff delay
        delay: Duration,
    },

    /// Acknowledgment observed; the sequence number has advanced
    Delivered {
        /// Sequence number that was acknowledged
        sequence: SequenceNumber,
        /// Attempts it took
        attempts: u32,
    },
}

impl SenderState {
    /// Sequence number of the frame currently in flight, if any
    pub fn in_flight(&self) -> Option<SequenceNumber> {
        match self {
            SenderState::Sending { sequence, .. }
            | SenderState::AwaitingAck { sequence, .. }
            | SenderState::BackingOff { sequence, .. } => Some(*sequence),
            SenderState::Idle | SenderState::Delivered { .. } => None,
        }
    }

    /// Short name of the state
    pub fn name(&self) -> &'static str {
        match self {
            SenderState::Idle => "Idle",
            SenderState::Sending { .. } => "Sending",
            SenderState::AwaitingAck { .. } => "AwaitingAck",
            SenderState::BackingOff { .. } => "BackingOff",
            SenderState::Delivered { .. } => "Delivered",
        }
    }
}

impl fmt::Display for SenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.in_flight() {
            Some(sequence) => write!(f, "{}(seq {})", self.name(), sequence),
            None => f.write_str(self.name()),
        }
    }
}
