//! Byte <-> bit conversion.
//!
//! Bits are carried as `u8` values of 0 or 1, one per element.

use serde::{Deserialize, Serialize};

/// Order in which the bits of each byte are emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitOrder {
    #[default]
    Msb,
    Lsb,
}

/// Convert byte to bit array
pub fn byte_to_bits(byte: u8, order: BitOrder) -> [u8; 8] {
    let mut bits = [0u8; 8];
    for (i, bit) in bits.iter_mut().enumerate() {
        let shift = match order {
            BitOrder::Msb => 7 - i,
            BitOrder::Lsb => i,
        };
        *bit = (byte >> shift) & 1;
    }
    bits
}

/// Convert up to 8 bits to a byte. Any non-zero element counts as a 1.
pub fn bits_to_byte(bits: &[u8], order: BitOrder) -> u8 {
    let mut byte = 0u8;
    for (i, &bit) in bits
        .iter()
        .enumerate()
        .take(8)
    {
        if bit != 0 {
            let shift = match order {
                BitOrder::Msb => 7 - i,
                BitOrder::Lsb => i,
            };
            byte |= 1 << shift;
        }
    }
    byte
}

/// Convert bytes to bit vector, 8 bits per byte
pub fn bytes_to_bits(bytes: &[u8], order: BitOrder) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        bits.extend_from_slice(&byte_to_bits(byte, order));
    }
    bits
}

/// Convert bit vector to bytes.
///
/// Trailing bits that do not complete a byte are dropped.
pub fn bits_to_bytes(bits: &[u8], order: BitOrder) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| bits_to_byte(chunk, order))
        .collect()
}

/// Positions where `sent` and `received` differ, plus every bit one has and
/// the other lacks
pub fn count_bit_errors(sent: &[u8], received: &[u8]) -> usize {
    sent.iter().zip(received).filter(|(a, b)| a != b).count() + sent.len().abs_diff(received.len())
}
