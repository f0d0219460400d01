//! Frame encoding, decoding and checksum validation.
//!
//! ## Frame Format
//!
//! | Byte | Field            | Description                                    |
//! |------|------------------|------------------------------------------------|
//! | 0    | `mcs`            | Modulation and coding scheme selector          |
//! | 1    | `payload_length` | Number of payload bytes that follow            |
//! | 2    | `sequence`       | Sender sequence number, wraps modulo 256       |
//! | 3    | `destination`    | Address of the intended receiver               |
//! | 4    | `source`         | Address of the sender                          |
//! | 5    | `checksum`       | Additive checksum over bytes 0..5 and payload  |
//! | 6..  | payload          | `payload_length` raw bytes                     |
//!
//! The checksum is the low byte of the sum of the five preceding header
//! bytes and every payload byte. Any single flipped bit changes the sum by a
//! non-zero amount modulo 256 and is always detected. Multi-bit patterns whose
//! changes cancel modulo 256 (for example setting bit 7 in two bytes) are not.

use bytes::{BufMut, Bytes, BytesMut};

use crate::core::{
    Address, Error, Result, SequenceNumber, ACK_PAYLOAD, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};

/// Fixed six-byte frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub mcs: u8,
    pub payload_length: u8,
    pub sequence: SequenceNumber,
    pub destination: Address,
    pub source: Address,
    pub checksum: u8,
}

impl Header {
    /// Parses the header from the first six bytes of `bytes`
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::TruncatedHeader { len: bytes.len() });
        }

        Ok(Header {
            mcs: bytes[0],
            payload_length: bytes[1],
            sequence: SequenceNumber(bytes[2]),
            destination: Address(bytes[3]),
            source: Address(bytes[4]),
            checksum: bytes[5],
        })
    }

    /// Returns the header in wire order
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        [
            self.mcs,
            self.payload_length,
            self.sequence.0,
            self.destination.0,
            self.source.0,
            self.checksum,
        ]
    }
}

/// One decoded frame: header plus payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    pub payload: Bytes,
}

impl Frame {
    /// Builds a frame with a freshly computed checksum
    pub fn new(
        mcs: u8,
        sequence: SequenceNumber,
        destination: Address,
        source: Address,
        payload: impl Into<Bytes>,
    ) -> Result<Self> {
        let payload = payload.into();
        let payload_length = payload_length(&payload)?;

        let mut header = Header {
            mcs,
            payload_length,
            sequence,
            destination,
            source,
            checksum: 0,
        };
        header.checksum = checksum(&header, &payload);

        Ok(Frame { header, payload })
    }

    /// Builds the acknowledgment for `frame`, sent back from `local`
    pub fn ack_for(frame: &Frame, local: Address) -> Self {
        let payload = Bytes::from_static(ACK_PAYLOAD);
        let mut header = Header {
            mcs: frame.header.mcs,
            payload_length: ACK_PAYLOAD.len() as u8,
            sequence: frame.header.sequence,
            destination: frame.header.source,
            source: local,
            checksum: 0,
        };
        header.checksum = checksum(&header, &payload);

        Frame { header, payload }
    }

    /// Serializes the frame, header first
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        buf.put_slice(&self.header.to_bytes());
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Whether the stored checksum matches the frame contents
    pub fn validate_checksum(&self) -> bool {
        validate_checksum(self)
    }

    /// Like [`Frame::validate_checksum`], reporting both values on failure
    pub fn verify(&self) -> Result<()> {
        let computed = checksum(&self.header, &self.payload);
        if computed != self.header.checksum {
            return Err(Error::ChecksumMismatch {
                expected: self.header.checksum,
                computed,
            });
        }
        Ok(())
    }

    /// Whether the declared payload length matches the carried payload
    pub fn length_matches(&self) -> bool {
        self.header.payload_length as usize == self.payload.len()
    }

    /// Whether this frame is addressed to `local`
    pub fn check_destination(&self, local: Address) -> bool {
        check_destination(self, local)
    }

    /// Whether this frame carries the acknowledgment sentinel
    pub fn is_ack(&self) -> bool {
        self.payload.as_ref() == ACK_PAYLOAD
    }

    /// Whether this frame acknowledges `sequence`
    pub fn acknowledges(&self, sequence: SequenceNumber) -> bool {
        self.header.sequence == sequence && self.is_ack()
    }
}

fn payload_length(payload: &[u8]) -> Result<u8> {
    if payload.is_empty() || payload.len() > MAX_PAYLOAD_SIZE {
        return Err(Error::field_range(
            "payload_length",
            payload.len() as i64,
            1,
            MAX_PAYLOAD_SIZE as i64,
        ));
    }
    Ok(payload.len() as u8)
}

/// Computes the additive checksum over the header fields and payload
pub fn checksum(header: &Header, payload: &[u8]) -> u8 {
    let fields = [
        header.mcs,
        header.payload_length,
        header.sequence.0,
        header.destination.0,
        header.source.0,
    ];

    fields
        .iter()
        .chain(payload)
        .fold(0u8, |acc, byte| acc.wrapping_add(*byte))
}

/// Encodes a frame into its wire bytes
pub fn encode(
    mcs: u8,
    sequence: SequenceNumber,
    destination: Address,
    source: Address,
    payload: &[u8],
) -> Result<Bytes> {
    Frame::new(
        mcs,
        sequence,
        destination,
        source,
        Bytes::copy_from_slice(payload),
    )
    .map(|frame| frame.to_bytes())
}

/// Decodes wire bytes into a frame without validating it
///
/// Every byte after the header is payload; the declared length is not
/// enforced here (see [`Frame::length_matches`]).
pub fn decode(bytes: impl Into<Bytes>) -> Result<Frame> {
    let mut bytes = bytes.into();
    let header = Header::parse(&bytes)?;
    let payload = bytes.split_off(HEADER_SIZE);

    Ok(Frame { header, payload })
}

/// Recomputes the checksum of `frame` and compares it with the stored one
pub fn validate_checksum(frame: &Frame) -> bool {
    checksum(&frame.header, &frame.payload) == frame.header.checksum
}

/// Whether `frame` is addressed to `local`
pub fn check_destination(frame: &Frame, local: Address) -> bool {
    frame.header.destination == local
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello() -> Bytes {
        encode(0, SequenceNumber(0), Address(3), Address(1), b"HELLO").unwrap()
    }

    #[test]
    fn test_hello_wire_format() {
        let bytes = hello();
        // 0 + 5 + 0 + 3 + 1 + ('H' + 'E' + 'L' + 'L' + 'O' = 372) = 381 = 0x17D
        assert_eq!(&bytes[..HEADER_SIZE], &[0x00, 0x05, 0x00, 0x03, 0x01, 0x7D]);
        assert_eq!(&bytes[HEADER_SIZE..], b"HELLO");
    }

    #[test]
    fn test_encode_decode() {
        let payload: Vec<u8> = (0..=254).collect();
        let bytes = encode(7, SequenceNumber(200), Address(9), Address(4), &payload).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + payload.len());

        let frame = decode(bytes).unwrap();
        assert_eq!(frame.header.mcs, 7);
        assert_eq!(frame.header.payload_length, 255);
        assert_eq!(frame.header.sequence, SequenceNumber(200));
        assert_eq!(frame.header.destination, Address(9));
        assert_eq!(frame.header.source, Address(4));
        assert_eq!(frame.payload.as_ref(), payload.as_slice());
        assert!(frame.validate_checksum());
        assert!(frame.length_matches());
    }

    #[test]
    fn test_payload_length_bounds() {
        let err = encode(0, SequenceNumber(0), Address(1), Address(2), &[0u8; 256]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidFieldRange { field: "payload_length", value: 256, .. }
        ));

        let err = encode(0, SequenceNumber(0), Address(1), Address(2), &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidFieldRange { value: 0, .. }));

        assert!(encode(0, SequenceNumber(0), Address(1), Address(2), &[0xAA; 255]).is_ok());
    }

    #[test]
    fn test_truncated_header() {
        for len in 0..HEADER_SIZE {
            let err = decode(vec![0u8; len]).unwrap_err();
            assert!(matches!(err, Error::TruncatedHeader { len: l } if l == len));
        }

        // A bare header decodes with an empty payload
        let frame = decode(vec![1, 0, 2, 3, 4, 10]).unwrap();
        assert!(frame.payload.is_empty());
        assert!(frame.validate_checksum());
    }

    #[test]
    fn test_single_bit_flips_detected() {
        let bytes = hello();
        for byte in 0..bytes.len() {
            for bit in 0..8 {
                let mut corrupted = bytes.to_vec();
                corrupted[byte] ^= 1 << bit;
                let frame = decode(corrupted).unwrap();
                assert!(
                    !frame.validate_checksum(),
                    "flip of bit {} in byte {} went undetected",
                    bit,
                    byte
                );
            }
        }
    }

    #[test]
    fn test_cancelling_flips_are_blind_spot() {
        // 'H' and 'E' both have bit 7 clear; setting it in both adds 256
        let mut corrupted = hello().to_vec();
        corrupted[HEADER_SIZE] ^= 0x80;
        corrupted[HEADER_SIZE + 1] ^= 0x80;
        let frame = decode(corrupted).unwrap();
        assert!(frame.validate_checksum());
    }

    #[test]
    fn test_verify_reports_values() {
        let mut frame = decode(hello()).unwrap();
        frame.header.checksum = 0x10;
        match frame.verify() {
            Err(Error::ChecksumMismatch { expected, computed }) => {
                assert_eq!(expected, 0x10);
                assert_eq!(computed, 0x7D);
            }
            other => panic!("unexpected verify result: {:?}", other),
        }
    }

    #[test]
    fn test_length_mismatch_is_visible() {
        let mut bytes = hello().to_vec();
        bytes.push(b'!');
        let frame = decode(bytes).unwrap();
        assert!(!frame.length_matches());
    }

    #[test]
    fn test_destination_filter() {
        let frame = decode(hello()).unwrap();
        assert!(check_destination(&frame, Address(3)));
        for other in (0..=255u8).filter(|a| *a != 3) {
            assert!(!frame.check_destination(Address(other)));
        }
    }

    #[test]
    fn test_ack_frame() {
        let data = decode(hello()).unwrap();
        let ack = Frame::ack_for(&data, Address(3));

        assert_eq!(ack.header.sequence, SequenceNumber(0));
        assert_eq!(ack.header.destination, Address(1));
        assert_eq!(ack.header.source, Address(3));
        assert_eq!(ack.payload.as_ref(), b"ACK");
        assert!(ack.validate_checksum());
        assert!(ack.acknowledges(SequenceNumber(0)));
        assert!(!ack.acknowledges(SequenceNumber(1)));
        assert!(!data.is_ack());

        let reparsed = decode(ack.to_bytes()).unwrap();
        assert_eq!(reparsed, ack);
    }
}
