use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use tokio::net::UdpSocket;

use crate::core::{Error, Result, SessionConfig, MAX_FRAME_SIZE};
use super::Transport;

/// Datagram transport: publishes to one endpoint, receives on another
pub struct UdpTransport {
    /// Socket bound to the receive endpoint
    socket: UdpSocket,
    /// Endpoint outbound frames are sent to
    transmit_endpoint: SocketAddr,
    /// Buffer for receiving data
    recv_buffer: BytesMut,
}

impl UdpTransport {
    /// Binds `receive_endpoint` and targets `transmit_endpoint`
    pub async fn bind(receive_endpoint: SocketAddr, transmit_endpoint: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(receive_endpoint)
            .await
            .map_err(|e| Error::transport(format!("Failed to bind {}: {}", receive_endpoint, e)))?;

        tracing::debug!(
            "UDP transport bound on {}, publishing to {}",
            receive_endpoint,
            transmit_endpoint
        );

        Ok(UdpTransport {
            socket,
            transmit_endpoint,
            recv_buffer: BytesMut::zeroed(MAX_FRAME_SIZE + 1),
        })
    }

    /// Binds the endpoints named in `config`
    pub async fn from_config(config: &SessionConfig) -> Result<Self> {
        Self::bind(config.receive_endpoint, config.transmit_endpoint).await
    }

    /// Returns the local socket address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr()
            .map_err(|e| Error::transport(format!("Failed to get local address: {}", e)))
    }

    /// Redirects outbound frames to `endpoint`
    pub fn set_transmit_endpoint(&mut self, endpoint: SocketAddr) {
        self.transmit_endpoint = endpoint;
    }
}

impl Transport for UdpTransport {
    async fn publish(&mut self, frame: Bytes) -> Result<()> {
        self.socket.send_to(&frame, self.transmit_endpoint).await
            .map_err(|e| Error::transport(format!("Failed to send frame: {}", e)))?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Bytes> {
        let (size, _addr) = self.socket.recv_from(&mut self.recv_buffer[..]).await
            .map_err(|e| Error::transport(format!("Failed to receive frame: {}", e)))?;
        Ok(Bytes::copy_from_slice(&self.recv_buffer[..size]))
    }
}
