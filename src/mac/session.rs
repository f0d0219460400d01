use std::collections::{HashMap, VecDeque};

use bytes::Bytes;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;

use crate::core::{Address, Result, SequenceNumber, SessionConfig};
use crate::network::Transport;
use crate::protocol::{Frame, SenderState};
use super::backoff::{ConstantFrameTime, FrameTimer};
use super::transform::{Passthrough, PayloadTransform};

/// Data frames held for `accept` after arriving during an ACK wait
pub(crate) const MAX_PENDING_FRAMES: usize = 64;

/// Counters kept by a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames published, retransmissions included
    pub frames_sent: u64,
    /// Publishes of a frame that had already been sent
    pub retransmissions: u64,
    /// Acknowledgments that completed a send
    pub acks_received: u64,
    /// Acknowledgments published for accepted frames
    pub acks_sent: u64,
    /// Inbound frames dropped for a bad checksum
    pub checksum_failures: u64,
    /// Inbound frames dropped as truncated or with a wrong length
    pub malformed_frames: u64,
    /// Valid frames that were not addressed to us or not expected
    pub frames_ignored: u64,
    /// Payloads delivered to the caller for the first time
    pub frames_delivered: u64,
    /// Retransmitted payloads seen again after a lost acknowledgment
    pub duplicates: u64,
}

/// One MAC endpoint: an owned transport, an address and a sequence counter
///
/// The session exclusively owns its transport; two sessions never share
/// endpoints or sequence state.
pub struct Session<T> {
    pub(crate) config: SessionConfig,
    pub(crate) transport: T,
    /// Sequence number the next new frame will carry
    pub(crate) sequence: SequenceNumber,
    pub(crate) state: SenderState,
    pub(crate) stats: SessionStats,
    pub(crate) timer: Box<dyn FrameTimer>,
    pub(crate) transform: Box<dyn PayloadTransform>,
    pub(crate) rng: StdRng,
    pub(crate) shutdown: Option<watch::Receiver<bool>>,
    /// Last sequence and payload accepted from each source
    pub(crate) last_accepted: HashMap<Address, (SequenceNumber, Bytes)>,
    /// Data frames already acknowledged while a send was waiting
    pub(crate) pending: VecDeque<Frame>,
}

impl<T: Transport> Session<T> {
    /// Creates a session over `transport`
    pub fn new(config: SessionConfig, transport: T) -> Result<Self> {
        config.validate()?;

        tracing::debug!(
            "Creating session for address {} (ack timeout {:?}, mtu {})",
            config.address,
            config.ack_timeout,
            config.mtu
        );

        Ok(Session {
            timer: Box::new(ConstantFrameTime(config.frame_time)),
            config,
            transport,
            sequence: SequenceNumber::initial(),
            state: SenderState::Idle,
            stats: SessionStats::default(),
            transform: Box::new(Passthrough),
            rng: StdRng::from_entropy(),
            shutdown: None,
            last_accepted: HashMap::new(),
            pending: VecDeque::new(),
        })
    }

    /// Replaces the frame timing strategy used to scale backoff
    pub fn with_frame_timer(mut self, timer: impl FrameTimer + 'static) -> Self {
        self.timer = Box::new(timer);
        self
    }

    /// Installs a payload transform (e.g. forward error correction)
    pub fn with_transform(mut self, transform: impl PayloadTransform + 'static) -> Self {
        self.transform = Box::new(transform);
        self
    }

    /// Aborts in-flight sends once `shutdown` becomes `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Seeds the backoff generator for reproducible runs
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Starts numbering new frames at `sequence`
    pub fn with_initial_sequence(mut self, sequence: SequenceNumber) -> Self {
        self.sequence = sequence;
        self
    }
}

impl<T> Session<T> {
    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Sequence number the next new frame will carry
    pub fn next_sequence(&self) -> SequenceNumber {
        self.sequence
    }

    pub fn sender_state(&self) -> SenderState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Data frames already acknowledged and waiting for `accept`
    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }

    /// Whether the shutdown flag is currently raised
    pub(crate) fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

/// Resolves once the shutdown flag is raised; never resolves without one
pub(crate) async fn shutdown_signal(shutdown: &mut Option<watch::Receiver<bool>>) {
    if let Some(rx) = shutdown {
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone without signalling
                break;
            }
        }
    }
    std::future::pending::<()>().await
}
