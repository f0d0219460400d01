use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::core::{Error, Result};
use crate::network::Transport;
use crate::protocol::{frame, Frame};
use super::session::{Session, MAX_PENDING_FRAMES};

/// A data frame accepted for this node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The frame as received
    pub frame: Frame,
    /// Payload after the inbound transform
    pub payload: Bytes,
    /// Whether this repeats the last frame accepted from the same source
    pub duplicate: bool,
}

impl<T: Transport> Session<T> {
    /// Waits up to `timeout` for one valid frame
    ///
    /// `None` waits indefinitely and a zero timeout only checks what is
    /// already queued. Returns `Ok(None)` on timeout or when the frame that
    /// arrived was dropped (bad checksum, truncated, wrong length). Frames
    /// held during an ACK wait are returned first and were acknowledged when
    /// they arrived. Other frames are not acknowledged here (see
    /// [`Session::accept`]).
    pub async fn receive(&mut self, timeout: Option<Duration>) -> Result<Option<Frame>> {
        Ok(self.next_frame(timeout).await?.map(|(frame, _)| frame))
    }

    /// Next valid frame and whether it was already acknowledged
    async fn next_frame(&mut self, timeout: Option<Duration>) -> Result<Option<(Frame, bool)>> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(Some((frame, true)));
        }

        let bytes = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.transport.recv()).await {
                Ok(bytes) => bytes?,
                Err(_) => return Ok(None),
            },
            None => self.transport.recv().await?,
        };

        Ok(self.screen(bytes).map(|frame| (frame, false)))
    }

    /// Receives using the configured receive timeout
    pub async fn receive_next(&mut self) -> Result<Option<Frame>> {
        self.receive(self.config.receive_timeout).await
    }

    /// Checks for an already queued frame without waiting
    pub async fn poll(&mut self) -> Result<Option<Frame>> {
        self.receive(Some(Duration::ZERO)).await
    }

    /// Waits up to `timeout` for a data frame addressed to this node
    ///
    /// Frames for other nodes and stray acknowledgments are skipped. An
    /// accepted frame is acknowledged before it is returned. A frame with the
    /// same sequence and payload as the last one accepted from its source is
    /// a retransmission: it is acknowledged again and flagged as a duplicate.
    pub async fn accept(&mut self, timeout: Option<Duration>) -> Result<Option<Delivery>> {
        // Too far out to represent is the same as no deadline
        let deadline = timeout.and_then(|limit| Instant::now().checked_add(limit));

        loop {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let Some((frame, acknowledged)) = self.next_frame(remaining).await? else {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return Ok(None);
                }
                continue;
            };

            if !frame.check_destination(self.config.address) {
                debug!(
                    "Frame for {} is not addressed to {}, dropping",
                    frame.header.destination,
                    self.config.address
                );
                self.stats.frames_ignored += 1;
                continue;
            }

            if frame.is_ack() {
                trace!("Ignoring stray ACK for seq {}", frame.header.sequence);
                self.stats.frames_ignored += 1;
                continue;
            }

            let payload = match self.transform.decode(&frame.payload) {
                Ok(payload) => Bytes::from(payload),
                Err(e) => {
                    warn!("Failed to recover payload of seq {}: {}", frame.header.sequence, e);
                    self.stats.malformed_frames += 1;
                    continue;
                }
            };

            if !acknowledged {
                self.acknowledge(&frame).await?;
            }

            let source = frame.header.source;
            let sequence = frame.header.sequence;
            let duplicate = match self.last_accepted.insert(source, (sequence, frame.payload.clone())) {
                Some((last_sequence, last_payload)) => {
                    last_sequence == sequence && last_payload == frame.payload
                }
                None => false,
            };
            if duplicate {
                debug!("Duplicate seq {} from {}, re-acknowledged", sequence, source);
                self.stats.duplicates += 1;
            } else {
                self.stats.frames_delivered += 1;
            }

            return Ok(Some(Delivery { frame, payload, duplicate }));
        }
    }

    /// Publishes the acknowledgment for `frame`
    pub async fn acknowledge(&mut self, frame: &Frame) -> Result<()> {
        let ack = Frame::ack_for(frame, self.config.address);
        debug!("Sending ACK for seq {} to {}", ack.header.sequence, ack.header.destination);

        self.transport.publish(ack.to_bytes()).await?;
        self.stats.acks_sent += 1;
        Ok(())
    }

    /// Acknowledges a data frame that arrived during an ACK wait and keeps
    /// it for the next `accept`
    ///
    /// When the queue is full the frame is left unacknowledged so the peer
    /// retransmits it later.
    pub(crate) async fn hold_for_accept(&mut self, frame: Frame) -> Result<()> {
        if self.pending.len() >= MAX_PENDING_FRAMES {
            warn!(
                "Pending queue full, leaving seq {} from {} unacknowledged",
                frame.header.sequence,
                frame.header.source
            );
            self.stats.frames_ignored += 1;
            return Ok(());
        }

        if let Err(e) = self.transform.decode(&frame.payload) {
            warn!("Failed to recover payload of seq {}: {}", frame.header.sequence, e);
            self.stats.malformed_frames += 1;
            return Ok(());
        }

        debug!(
            "Holding seq {} from {} until the current send completes",
            frame.header.sequence,
            frame.header.source
        );
        self.acknowledge(&frame).await?;
        self.pending.push_back(frame);
        Ok(())
    }

    /// Decodes and validates inbound bytes, dropping anything unusable
    pub(crate) fn screen(&mut self, bytes: Bytes) -> Option<Frame> {
        let frame = match frame::decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                self.stats.malformed_frames += 1;
                return None;
            }
        };

        if let Err(e) = frame.verify() {
            debug!("Discarding frame from {}: {}", frame.header.source, e);
            self.stats.checksum_failures += 1;
            return None;
        }

        if !frame.length_matches() {
            let e = Error::LengthMismatch {
                declared: frame.header.payload_length,
                actual: frame.payload.len(),
            };
            warn!("Discarding frame from {}: {}", frame.header.source, e);
            self.stats.malformed_frames += 1;
            return None;
        }

        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Address, SequenceNumber, SessionConfig};
    use crate::mac::PayloadTransform;
    use crate::network::MemoryTransport;

    fn session(address: u8) -> (Session<MemoryTransport>, MemoryTransport) {
        let (transport, peer) = MemoryTransport::pair();
        (Session::new(SessionConfig::new(address), transport).unwrap(), peer)
    }

    fn data(seq: u8, dest: u8, src: u8, payload: &'static [u8]) -> Bytes {
        frame::encode(0, SequenceNumber(seq), Address(dest), Address(src), payload).unwrap()
    }

    #[tokio::test]
    async fn test_receive_times_out_with_none() {
        let (mut session, _peer) = session(3);
        let got = session.receive(Some(Duration::from_millis(10))).await.unwrap();
        assert!(got.is_none());
        assert!(session.poll().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_receive_returns_valid_frame_without_ack() {
        let (mut session, mut peer) = session(3);
        peer.publish(data(0, 3, 1, b"HELLO")).await.unwrap();

        let frame = session.poll().await.unwrap().unwrap();
        assert_eq!(frame.payload.as_ref(), b"HELLO");
        assert!(frame.check_destination(Address(3)));

        // Nothing was published back
        assert!(tokio::time::timeout(Duration::from_millis(10), peer.recv()).await.is_err());
        assert_eq!(session.stats().acks_sent, 0);
    }

    #[tokio::test]
    async fn test_receive_drops_bad_frames() {
        let (mut session, mut peer) = session(3);

        let mut corrupted = data(0, 3, 1, b"HELLO").to_vec();
        corrupted[7] ^= 0x04;
        peer.publish(corrupted.into()).await.unwrap();
        peer.publish(Bytes::from_static(&[0, 1, 2])).await.unwrap();

        let mut padded = data(0, 3, 1, b"HELLO").to_vec();
        padded.push(0);
        peer.publish(padded.into()).await.unwrap();

        for _ in 0..3 {
            assert!(session.poll().await.unwrap().is_none());
        }
        let stats = session.stats();
        assert_eq!(stats.checksum_failures, 1);
        assert_eq!(stats.malformed_frames, 2);
    }

    #[tokio::test]
    async fn test_accept_filters_and_acknowledges() {
        let (mut session, mut peer) = session(3);

        peer.publish(data(0, 4, 1, b"not yours")).await.unwrap();
        peer.publish(data(5, 3, 1, b"ACK")).await.unwrap();
        peer.publish(data(0, 3, 1, b"HELLO")).await.unwrap();

        let delivery = session.accept(Some(Duration::from_millis(50))).await.unwrap().unwrap();
        assert_eq!(delivery.payload.as_ref(), b"HELLO");
        assert!(!delivery.duplicate);

        let ack = frame::decode(peer.recv().await.unwrap()).unwrap();
        assert!(ack.validate_checksum());
        assert!(ack.acknowledges(SequenceNumber(0)));
        assert_eq!(ack.header.destination, Address(1));
        assert_eq!(ack.header.source, Address(3));

        let stats = session.stats();
        assert_eq!(stats.frames_ignored, 2);
        assert_eq!(stats.frames_delivered, 1);
        assert_eq!(stats.acks_sent, 1);
    }

    #[tokio::test]
    async fn test_accept_flags_retransmission() {
        let (mut session, mut peer) = session(3);

        peer.publish(data(0, 3, 1, b"HELLO")).await.unwrap();
        peer.publish(data(0, 3, 1, b"HELLO")).await.unwrap();
        peer.publish(data(1, 3, 1, b"NEXT")).await.unwrap();

        let first = session.accept(None).await.unwrap().unwrap();
        let second = session.accept(None).await.unwrap().unwrap();
        let third = session.accept(None).await.unwrap().unwrap();
        assert!(!first.duplicate);
        assert!(second.duplicate);
        assert!(!third.duplicate);

        // Every copy is acknowledged
        for expected in [0u8, 0, 1] {
            let ack = frame::decode(peer.recv().await.unwrap()).unwrap();
            assert!(ack.acknowledges(SequenceNumber(expected)));
        }
        assert_eq!(session.stats().duplicates, 1);
    }

    #[tokio::test]
    async fn test_restarted_sender_is_not_a_duplicate() {
        let (mut session, mut peer) = session(3);

        // Last frame of one run and first frame of the next both carry seq 0
        peer.publish(data(0, 3, 1, b"first run")).await.unwrap();
        peer.publish(data(0, 3, 1, b"second run")).await.unwrap();

        let first = session.accept(None).await.unwrap().unwrap();
        let second = session.accept(None).await.unwrap().unwrap();
        assert!(!first.duplicate);
        assert_eq!(second.payload.as_ref(), b"second run");
        assert!(!second.duplicate);
        assert_eq!(session.stats().frames_delivered, 2);
        assert_eq!(session.stats().duplicates, 0);
    }

    #[tokio::test]
    async fn test_duplicates_tracked_per_source() {
        let (mut session, mut peer) = session(3);

        peer.publish(data(0, 3, 1, b"same")).await.unwrap();
        peer.publish(data(0, 3, 2, b"same")).await.unwrap();
        peer.publish(data(0, 3, 1, b"same")).await.unwrap();

        let from_one = session.accept(None).await.unwrap().unwrap();
        let from_two = session.accept(None).await.unwrap().unwrap();
        let again = session.accept(None).await.unwrap().unwrap();
        assert!(!from_one.duplicate);
        assert!(!from_two.duplicate);
        assert!(again.duplicate);
    }

    #[tokio::test]
    async fn test_accept_with_unrepresentable_timeout() {
        let (mut session, mut peer) = session(3);
        peer.publish(data(0, 3, 1, b"HELLO")).await.unwrap();

        let delivery = session.accept(Some(Duration::MAX)).await.unwrap().unwrap();
        assert_eq!(delivery.payload.as_ref(), b"HELLO");
    }

    #[tokio::test]
    async fn test_accept_times_out() {
        let (mut session, mut peer) = session(3);
        peer.publish(data(0, 9, 1, b"elsewhere")).await.unwrap();

        let got = session.accept(Some(Duration::from_millis(20))).await.unwrap();
        assert!(got.is_none());
    }

    struct Invert;

    impl PayloadTransform for Invert {
        fn encode(&self, payload: &[u8]) -> Vec<u8> {
            payload.iter().map(|b| !b).collect()
        }

        fn decode(&self, payload: &[u8]) -> Result<Vec<u8>> {
            Ok(self.encode(payload))
        }
    }

    #[tokio::test]
    async fn test_transform_applied_after_validation() {
        let (transport, mut peer) = MemoryTransport::pair();
        let mut session = Session::new(SessionConfig::new(3), transport)
            .unwrap()
            .with_transform(Invert);

        let inverted: Vec<u8> = b"HELLO".iter().map(|b| !b).collect();
        let bytes = frame::encode(0, SequenceNumber(0), Address(3), Address(1), &inverted).unwrap();
        peer.publish(bytes).await.unwrap();

        let delivery = session.accept(Some(Duration::from_millis(50))).await.unwrap().unwrap();
        assert_eq!(delivery.payload.as_ref(), b"HELLO");
        assert_eq!(delivery.frame.payload.as_ref(), inverted.as_slice());
    }
}
