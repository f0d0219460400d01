use crate::core::HEADER_SIZE;

const HEADER_BITS: usize = HEADER_SIZE * 8;

/// A header recovered from the bit stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderTag {
    /// Absolute bit offset of the header's first bit
    pub offset: u64,
    /// The six header bytes, MSB first
    pub header: [u8; HEADER_SIZE],
}

impl HeaderTag {
    pub fn mcs(&self) -> u8 {
        self.header[0]
    }

    pub fn payload_length(&self) -> u8 {
        self.header[1]
    }
}

/// Accumulates a one-bit-per-sample stream into 48-bit header windows
///
/// Storage is a fixed array with a write cursor; nothing is allocated after
/// construction. Every completed window is reported and the window restarts.
#[derive(Debug, Clone)]
pub struct HeaderScanner {
    bits: [u8; HEADER_BITS],
    cursor: usize,
    consumed: u64,
}

impl Default for HeaderScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderScanner {
    pub fn new() -> Self {
        HeaderScanner {
            bits: [0; HEADER_BITS],
            cursor: 0,
            consumed: 0,
        }
    }

    /// Pushes one sample; only its least significant bit is used
    pub fn push(&mut self, sample: u8) -> Option<HeaderTag> {
        self.bits[self.cursor] = sample & 0x01;
        self.cursor += 1;
        self.consumed += 1;

        if self.cursor < HEADER_BITS {
            return None;
        }

        let mut header = [0u8; HEADER_SIZE];
        for (byte, chunk) in header.iter_mut().zip(self.bits.chunks_exact(8)) {
            *byte = chunk.iter().fold(0u8, |acc, bit| (acc << 1) | bit);
        }
        self.cursor = 0;

        Some(HeaderTag {
            offset: self.consumed - HEADER_BITS as u64,
            header,
        })
    }

    /// Pushes a block of samples, reporting each completed header
    pub fn feed(&mut self, samples: &[u8], mut on_header: impl FnMut(HeaderTag)) {
        for &sample in samples {
            if let Some(tag) = self.push(sample) {
                on_header(tag);
            }
        }
    }

    /// Bits held in the current partial window
    pub fn pending(&self) -> usize {
        self.cursor
    }

    /// Total samples consumed so far
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.consumed = 0;
    }
}
