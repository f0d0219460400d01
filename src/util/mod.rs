//! Utility module
//!
//! Helpers shared by the MAC layer, the CLI and the header scanner.

use std::slice::Chunks;

/// Splits `data` into MTU-sized pieces, the last one possibly shorter
///
/// An MTU of zero is treated as one byte per chunk. Empty input yields no
/// chunks.
pub fn chunk_payload(data: &[u8], mtu: usize) -> Chunks<'_, u8> {
    data.chunks(mtu.max(1))
}

/// Expands bytes into one sample per bit, most significant bit first
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |shift| (byte >> shift) & 0x01))
        .collect()
}

/// Packs one-bit samples back into bytes, MSB first
///
/// A trailing partial byte is padded with zero bits.
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, bit)| acc | ((bit & 0x01) << (7 - i)))
        })
        .collect()
}
