use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::{Address, Error, Result, SequenceNumber};
use crate::network::Transport;
use crate::protocol::{Frame, SenderState};
use crate::util::chunk_payload;
use super::backoff::sample_backoff;
use super::session::{shutdown_signal, Session};

/// Outcome of one acknowledged send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    /// Sequence number the frame carried
    pub sequence: SequenceNumber,
    /// Transmissions it took, starting at 1
    pub attempts: u32,
    /// Time from first transmission to acknowledgment
    pub elapsed: Duration,
}

impl<T: Transport> Session<T> {
    /// Sends one payload and retries until it is acknowledged
    ///
    /// The frame keeps its sequence number across retransmissions; the
    /// session's counter advances only when the matching ACK arrives. There is
    /// no attempt ceiling unless `max_attempts` is configured.
    ///
    /// # Errors
    /// - `InvalidFieldRange` if the payload is empty or longer than 255 bytes
    /// - `TransportUnavailable` if the channel fails
    /// - `Cancelled` if the shutdown signal fires; the sequence is not advanced
    /// - `AckTimeout` only when the configured `max_attempts` is exhausted
    pub async fn send(&mut self, payload: &[u8], destination: Address, mcs: u8) -> Result<SendReport> {
        let sequence = self.sequence;
        let encoded = self.transform.encode(payload);
        let frame = Frame::new(mcs, sequence, destination, self.config.address, encoded)?;
        let bytes = frame.to_bytes();
        let frame_time = self.timer.duration_for(mcs);

        let started = Instant::now();
        let mut attempt = 1u32;

        loop {
            if self.shutdown_requested() {
                debug!("Shutdown raised before attempt {} of seq {}", attempt, sequence);
                self.state = SenderState::Idle;
                return Err(Error::Cancelled(sequence));
            }

            self.state = SenderState::Sending { sequence, attempt };
            debug!("Sending frame to {} with seq {} (attempt {})", destination, sequence, attempt);

            if let Err(e) = self.transport.publish(bytes.clone()).await {
                self.state = SenderState::Idle;
                return Err(e);
            }
            self.stats.frames_sent += 1;
            if attempt > 1 {
                self.stats.retransmissions += 1;
            }

            self.state = SenderState::AwaitingAck { sequence, attempt };
            match self.await_ack(sequence).await {
                Ok(()) => {
                    debug!("Received ACK for seq {}", sequence);
                    self.sequence = sequence.next();
                    self.stats.acks_received += 1;
                    self.state = SenderState::Delivered { sequence, attempts: attempt };
                    debug!("{}, ready for the next frame", self.state);
                    self.state = SenderState::Idle;
                    return Ok(SendReport {
                        sequence,
                        attempts: attempt,
                        elapsed: started.elapsed(),
                    });
                }
                Err(Error::AckTimeout(_)) => {
                    debug!("No ACK received for seq {}", sequence);
                }
                Err(e) => {
                    self.state = SenderState::Idle;
                    return Err(e);
                }
            }

            if self.config.max_attempts.is_some_and(|max| attempt >= max) {
                warn!("Giving up on seq {} after {} attempts", sequence, attempt);
                self.state = SenderState::Idle;
                return Err(Error::AckTimeout(sequence));
            }

            let delay = sample_backoff(attempt, frame_time, &mut self.rng);
            self.state = SenderState::BackingOff { sequence, attempt, delay };
            debug!("Backing off for the {}th time: {:?}", attempt, delay);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_signal(&mut self.shutdown) => {
                    self.state = SenderState::Idle;
                    return Err(Error::Cancelled(sequence));
                }
            }

            attempt += 1;
        }
    }

    /// Splits `data` into MTU-sized chunks and sends them in order
    ///
    /// Stops at the first chunk that fails; earlier chunks stay delivered.
    pub async fn send_message(&mut self, data: &[u8], destination: Address, mcs: u8) -> Result<Vec<SendReport>> {
        let mut reports = Vec::new();
        for chunk in chunk_payload(data, self.config.mtu as usize) {
            reports.push(self.send(chunk, destination, mcs).await?);
        }

        if !reports.is_empty() {
            info!(
                "Delivered {} bytes to {} in {} frames",
                data.len(),
                destination,
                reports.len()
            );
        }
        Ok(reports)
    }

    /// Waits up to the ACK timeout for an acknowledgment of `sequence`
    ///
    /// Data frames addressed to this node are acknowledged and held for the
    /// next `accept`, so two nodes sending to each other both make progress.
    /// Anything else that is not the matching ACK is discarded and the wait
    /// continues against the same deadline.
    async fn await_ack(&mut self, sequence: SequenceNumber) -> Result<()> {
        let deadline = Instant::now() + self.config.ack_timeout;

        loop {
            let received = tokio::select! {
                received = tokio::time::timeout_at(deadline, self.transport.recv()) => received,
                _ = shutdown_signal(&mut self.shutdown) => {
                    debug!("Shutdown while awaiting ACK for seq {}", sequence);
                    return Err(Error::Cancelled(sequence));
                }
            };

            let bytes = match received {
                Ok(bytes) => bytes?,
                Err(_) => return Err(Error::AckTimeout(sequence)),
            };

            match self.screen(bytes) {
                Some(frame) if frame.acknowledges(sequence) => return Ok(()),
                Some(frame) if !frame.is_ack() && frame.check_destination(self.config.address) => {
                    self.hold_for_accept(frame).await?;
                }
                Some(frame) => {
                    debug!(
                        "Ignoring seq {} from {} while awaiting ACK for seq {}",
                        frame.header.sequence,
                        frame.header.source,
                        sequence
                    );
                    self.stats.frames_ignored += 1;
                }
                None => {}
            }
        }
    }
}
