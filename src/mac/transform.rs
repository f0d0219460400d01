use crate::core::Result;

/// Payload transform applied before framing and after checksum validation
///
/// This is where an error-correcting code plugs in. Acknowledgment frames
/// are never transformed.
pub trait PayloadTransform: Send + Sync {
    /// Transforms an outbound payload
    fn encode(&self, payload: &[u8]) -> Vec<u8>;

    /// Recovers an inbound payload
    fn decode(&self, payload: &[u8]) -> Result<Vec<u8>>;
}

/// Leaves payloads untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl PayloadTransform for Passthrough {
    fn encode(&self, payload: &[u8]) -> Vec<u8> {
        payload.to_vec()
    }

    fn decode(&self, payload: &[u8]) -> Result<Vec<u8>> {
        Ok(payload.to_vec())
    }
}
