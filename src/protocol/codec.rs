use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::{Error, HEADER_SIZE, MAX_FRAME_SIZE};

/// Delimits raw frames on a byte stream using the header's length field
///
/// Yields undecoded frame bytes; checksum validation stays with the MAC layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameCodec;

impl FrameCodec {
    /// Creates a new frame codec
    pub fn new() -> Self {
        FrameCodec
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            // Need more data to read the header
            src.reserve(HEADER_SIZE - src.len());
            return Ok(None);
        }

        let frame_len = HEADER_SIZE + src[1] as usize;
        if src.len() < frame_len {
            // Need more data to read the full payload
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        Ok(Some(src.split_to(frame_len).freeze()))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() < HEADER_SIZE {
            return Err(Error::TruncatedHeader { len: item.len() });
        }
        if item.len() > MAX_FRAME_SIZE {
            return Err(Error::field_range(
                "frame_length",
                item.len() as i64,
                HEADER_SIZE as i64,
                MAX_FRAME_SIZE as i64,
            ));
        }

        dst.extend_from_slice(&item);
        Ok(())
    }
}
