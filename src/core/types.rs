use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use super::{Error, Result};

/// Link-layer address of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub u8);

impl Address {
    /// Returns the raw address byte
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl From<u8> for Address {
    fn from(value: u8) -> Self {
        Address(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-sender frame sequence number, wrapping modulo 256
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceNumber(pub u8);

impl SequenceNumber {
    /// Returns the first sequence number of a session
    pub fn initial() -> Self {
        SequenceNumber(0)
    }

    /// Returns the following sequence number, wrapping 255 to 0
    pub fn next(&self) -> Self {
        SequenceNumber(self.0.wrapping_add(1))
    }

    /// Returns the raw sequence byte
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for one MAC session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// This node's address
    pub address: Address,
    /// Endpoint outbound frames are published to
    pub transmit_endpoint: SocketAddr,
    /// Endpoint inbound frames arrive on
    pub receive_endpoint: SocketAddr,
    /// Bounded wait for an acknowledgment per attempt
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub ack_timeout: Duration,
    /// Wait for inbound data; `None` blocks indefinitely, zero polls
    #[serde(serialize_with = "super::serde::serialize_opt_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_opt_duration")]
    pub receive_timeout: Option<Duration>,
    /// Largest chunk handed to a single frame
    pub mtu: u8,
    /// Frame transmission time used for backoff scaling
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub frame_time: Duration,
    /// Optional ceiling on transmission attempts per frame
    pub max_attempts: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            address: Address(0),
            transmit_endpoint: default_endpoint(super::DEFAULT_TRANSMIT_ENDPOINT, 5555),
            receive_endpoint: default_endpoint(super::DEFAULT_RECEIVE_ENDPOINT, 5556),
            ack_timeout: super::DEFAULT_ACK_TIMEOUT,
            receive_timeout: Some(super::DEFAULT_RECEIVE_TIMEOUT),
            mtu: super::DEFAULT_MTU,
            frame_time: super::DEFAULT_FRAME_TIME,
            max_attempts: None,
        }
    }
}

fn default_endpoint(addr: &str, port: u16) -> SocketAddr {
    addr.parse()
        .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], port)))
}

impl SessionConfig {
    /// Creates a configuration for `address` with default endpoints and timing
    pub fn new(address: u8) -> Self {
        SessionConfig {
            address: Address(address),
            ..Default::default()
        }
    }

    /// Checks the configuration for values the MAC layer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.mtu == 0 {
            return Err(Error::config("MTU must be between 1 and 255"));
        }
        if self.ack_timeout.is_zero() {
            return Err(Error::config("ACK timeout must be non-zero"));
        }
        if self.ack_timeout > super::MAX_ACK_TIMEOUT {
            return Err(Error::config(format!(
                "ACK timeout {:?} exceeds {:?}",
                self.ack_timeout,
                super::MAX_ACK_TIMEOUT
            )));
        }
        if self.frame_time > super::MAX_FRAME_TIME {
            return Err(Error::config(format!(
                "frame time {:?} exceeds {:?}",
                self.frame_time,
                super::MAX_FRAME_TIME
            )));
        }
        if self.max_attempts == Some(0) {
            return Err(Error::config("max_attempts must be at least 1"));
        }
        if self.transmit_endpoint == self.receive_endpoint {
            return Err(Error::config(format!(
                "transmit and receive endpoints must differ ({})",
                self.transmit_endpoint
            )));
        }
        Ok(())
    }

    /// Loads and validates a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: SessionConfig = serde_json::from_str(&text)
            .map_err(|e| Error::config(format!("Failed to parse {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_wraps() {
        assert_eq!(SequenceNumber::initial(), SequenceNumber(0));
        assert_eq!(SequenceNumber(0).next(), SequenceNumber(1));
        assert_eq!(SequenceNumber(254).next(), SequenceNumber(255));
        assert_eq!(SequenceNumber(255).next(), SequenceNumber(0));
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.address, Address(0));
        assert_eq!(config.transmit_endpoint.port(), 5555);
        assert_eq!(config.receive_endpoint.port(), 5556);
        assert_eq!(config.ack_timeout, Duration::from_millis(50));
        assert_eq!(config.mtu, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SessionConfig::new(1);
        config.mtu = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = SessionConfig::new(1);
        config.ack_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = SessionConfig::new(1);
        config.receive_endpoint = config.transmit_endpoint;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_huge_durations() {
        let mut config = SessionConfig::new(1);
        config.ack_timeout = Duration::from_secs(u64::MAX / 2);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = SessionConfig::new(1);
        config.frame_time = Duration::from_secs(3600);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = SessionConfig::new(1);
        config.ack_timeout = super::super::MAX_ACK_TIMEOUT;
        config.frame_time = super::super::MAX_FRAME_TIME;
        assert!(config.validate().is_ok());

        let parsed: SessionConfig = serde_json::from_str(r#"{ "ack_timeout": 1e18 }"#).unwrap();
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let mut config = SessionConfig::new(7);
        config.receive_timeout = None;
        config.max_attempts = Some(4);

        let json = serde_json::to_string(&config).unwrap();
        let parsed: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_partial_json() {
        let parsed: SessionConfig =
            serde_json::from_str(r#"{ "address": 3, "ack_timeout": 0.25 }"#).unwrap();
        assert_eq!(parsed.address, Address(3));
        assert_eq!(parsed.ack_timeout, Duration::from_millis(250));
        assert_eq!(parsed.mtu, 32);

        let out_of_range = serde_json::from_str::<SessionConfig>(r#"{ "address": 300 }"#);
        assert!(out_of_range.is_err());
    }
}
