use bytes::Bytes;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Bernoulli, Distribution};
use tokio::sync::mpsc;

use crate::core::{Error, Result};
use super::Transport;

/// In-process transport endpoint
///
/// Created in connected pairs: what one end publishes, the other receives.
#[derive(Debug)]
pub struct MemoryTransport {
    outbound: mpsc::UnboundedSender<Bytes>,
    inbound: mpsc::UnboundedReceiver<Bytes>,
}

impl MemoryTransport {
    /// Creates two connected endpoints
    pub fn pair() -> (MemoryTransport, MemoryTransport) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();

        (
            MemoryTransport { outbound: a_tx, inbound: b_rx },
            MemoryTransport { outbound: b_tx, inbound: a_rx },
        )
    }
}

impl Transport for MemoryTransport {
    async fn publish(&mut self, frame: Bytes) -> Result<()> {
        self.outbound.send(frame)
            .map_err(|_| Error::transport("peer endpoint dropped"))
    }

    async fn recv(&mut self) -> Result<Bytes> {
        self.inbound.recv().await
            .ok_or_else(|| Error::transport("peer endpoint dropped"))
    }
}

/// Wraps a transport and drops outbound frames at random
///
/// Drops are drawn from a seeded generator so runs are reproducible.
#[derive(Debug)]
pub struct LossyTransport<T> {
    inner: T,
    loss: Bernoulli,
    rng: StdRng,
    dropped: u64,
}

impl<T: Transport + Send> LossyTransport<T> {
    /// Drops each outbound frame with probability `loss_rate`
    pub fn new(inner: T, loss_rate: f64, seed: u64) -> Result<Self> {
        let loss = Bernoulli::new(loss_rate)
            .map_err(|e| Error::config(format!("Invalid loss rate {}: {}", loss_rate, e)))?;

        Ok(LossyTransport {
            inner,
            loss,
            rng: StdRng::seed_from_u64(seed),
            dropped: 0,
        })
    }

    /// Number of frames dropped so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transport + Send> Transport for LossyTransport<T> {
    async fn publish(&mut self, frame: Bytes) -> Result<()> {
        if self.loss.sample(&mut self.rng) {
            self.dropped += 1;
            tracing::trace!("Dropping outbound frame of {} bytes", frame.len());
            return Ok(());
        }
        self.inner.publish(frame).await
    }

    async fn recv(&mut self) -> Result<Bytes> {
        self.inner.recv().await
    }
}
