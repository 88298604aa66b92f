//! # Message Integrity Primitives
//!
//! Pure functions over byte spans used by the format decoders:
//!
//! - [`lfsr_digest16`]: LFSR-16 digest (6-in-1, 7-in-1, lightning)
//! - [`add_bytes`]: 8-bit wrapping sum (6-in-1)
//! - [`crc16`]: CRC16, MSB first, no final XOR (leakage)
//! - [`count_bits`]: set-bit count used by the 5-in-1 checksum

/// Compute an LFSR-16 digest over `message`.
///
/// For each bit (MSB first) the accumulator is XORed with `key` when the bit
/// is set; `key` is then rotated right by one, reinserting `gen` whenever a
/// one is dropped from bit 0.
pub fn lfsr_digest16(message: &[u8], gen: u16, key: u16) -> u16 {
    let mut sum: u16 = 0;
    let mut key = key;
    for &data in message {
        for bit in (0..8).rev() {
            if (data >> bit) & 1 != 0 {
                sum ^= key;
            }
            key = if key & 1 != 0 { (key >> 1) ^ gen } else { key >> 1 };
        }
    }
    sum
}

/// 8-bit wrapping sum of all bytes, returned widened to `u16`.
pub fn add_bytes(message: &[u8]) -> u16 {
    message.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) as u16
}

/// CRC16 with the given polynomial and initial value.
///
/// MSB first, no input/output reflection, no final XOR. With polynomial
/// 0x1021 and init 0 this is CRC-16/XMODEM.
pub fn crc16(message: &[u8], polynomial: u16, init: u16) -> u16 {
    let mut remainder = init;
    for &byte in message {
        remainder ^= (byte as u16) << 8;
        for _ in 0..8 {
            remainder = if remainder & 0x8000 != 0 {
                (remainder << 1) ^ polynomial
            } else {
                remainder << 1
            };
        }
    }
    remainder
}

/// Number of set bits across all bytes.
pub fn count_bits(message: &[u8]) -> u32 {
    message.iter().map(|b| b.count_ones()).sum()
}
