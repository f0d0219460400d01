use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::core::{Error, Result};
use crate::protocol::FrameCodec;
use super::Transport;

/// Transport over a byte stream (TCP, pipes, in-memory duplex)
///
/// Frames are delimited by their own header, so a stream carries them
/// back to back without extra framing.
pub struct StreamTransport<S> {
    framed: Framed<S, FrameCodec>,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps `io` with the frame delimiter
    pub fn new(io: S) -> Self {
        StreamTransport {
            framed: Framed::new(io, FrameCodec::new()),
        }
    }

    /// Returns the underlying stream
    pub fn into_inner(self) -> S {
        self.framed.into_inner()
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn publish(&mut self, frame: Bytes) -> Result<()> {
        self.framed.send(frame).await
    }

    async fn recv(&mut self) -> Result<Bytes> {
        match self.framed.next().await {
            Some(frame) => frame,
            None => Err(Error::transport("stream closed")),
        }
    }
}
