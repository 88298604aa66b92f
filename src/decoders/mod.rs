//! # Message Decoders
//!
//! One decoder per Bresser message family. Each decoder checks its own
//! integrity code first; only a message that passes is attributed to that
//! family, its sensor id resolved to a slot and the fields extracted.
//!
//! ## Formats
//!
//! | Decoder | Integrity | Sensors |
//! |---------|-----------|---------|
//! | [`Bresser5In1Decoder`] | complement halves + bit count | 5-in-1 weather, professional rain gauge |
//! | [`Bresser6In1Decoder`] | LFSR-16 digest + additive checksum | 6-in-1 weather, thermo/hygro, pool, soil |
//! | [`Bresser7In1Decoder`] | whitened LFSR-16 digest | 7-in-1/8-in-1 weather, PM, CO2, HCHO/VOC |
//! | [`LightningDecoder`] | whitened LFSR-16 digest | lightning |
//! | [`LeakageDecoder`] | CRC16 | water leakage |
//!
//! [`dispatch`] tries the enabled decoders in priority order and stops at
//! the first result that is not an integrity failure or `Invalid`.

use bitflags::bitflags;

use crate::error::DecodeStatus;
use crate::sensor::{SlotManager, SlotResolution};

pub mod bresser5in1;
pub mod bresser6in1;
pub mod bresser7in1;
pub mod leakage;
pub mod lightning;

pub use bresser5in1::Bresser5In1Decoder;
pub use bresser6in1::Bresser6In1Decoder;
pub use bresser7in1::Bresser7In1Decoder;
pub use leakage::LeakageDecoder;
pub use lightning::LightningDecoder;

bitflags! {
    /// Enabled decoder mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DecoderFlags: u8 {
        const B5IN1 = 0x01;
        const B6IN1 = 0x02;
        const B7IN1 = 0x04;
        const LIGHTNING = 0x08;
        const LEAKAGE = 0x10;
    }
}

impl Default for DecoderFlags {
    fn default() -> Self {
        DecoderFlags::from_bits_retain(crate::constants::DEFAULT_DECODERS)
    }
}

/// Result of one decode attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeResult {
    pub status: DecodeStatus,
    /// Slot written on `Ok`
    pub slot: Option<usize>,
}

impl DecodeResult {
    pub fn ok(slot: usize) -> Self {
        Self {
            status: DecodeStatus::Ok,
            slot: Some(slot),
        }
    }

    pub fn status(status: DecodeStatus) -> Self {
        Self { status, slot: None }
    }
}

impl From<DecodeStatus> for DecodeResult {
    fn from(status: DecodeStatus) -> Self {
        DecodeResult::status(status)
    }
}

/// A decoder for one message family
pub trait MessageDecoder: Send + Sync + std::fmt::Debug {
    /// Decode `msg` (preamble removed) into a slot of `slots`
    fn decode(&self, msg: &[u8], rssi: f32, slots: &mut SlotManager) -> DecodeResult;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Bit enabling this decoder in a [`DecoderFlags`] mask
    fn flag(&self) -> DecoderFlags;
}

/// Decoders in dispatch priority order
pub static DECODERS: [&dyn MessageDecoder; 5] = [
    &Bresser7In1Decoder,
    &Bresser6In1Decoder,
    &Bresser5In1Decoder,
    &LightningDecoder,
    &LeakageDecoder,
];

/// Try every enabled decoder in priority order.
///
/// Stops at `Ok`, `Skip` or `Full`. Returns `Invalid` when no enabled
/// decoder claimed the message.
pub fn dispatch(msg: &[u8], rssi: f32, slots: &mut SlotManager, enabled: DecoderFlags) -> DecodeResult {
    let mut result = DecodeResult::status(DecodeStatus::Invalid);
    for decoder in DECODERS.iter().filter(|d| enabled.contains(d.flag())) {
        let _span = crate::util::logging::span_decode(decoder.name());
        result = decoder.decode(msg, rssi, slots);
        log::trace!("[{}] {}", decoder.name(), result.status);
        if result.status.stops_dispatch() {
            return result;
        }
    }
    if result.status.is_integrity_failure() {
        result = DecodeResult::status(DecodeStatus::Invalid);
    }
    result
}

/// Resolve `id` to a slot index, mapping filter outcomes to a status
pub(crate) fn claim_slot(slots: &SlotManager, id: u32) -> Result<usize, DecodeStatus> {
    match slots.resolve(id) {
        SlotResolution::Slot(idx) => Ok(idx),
        SlotResolution::Skip => Err(DecodeStatus::Skip),
        SlotResolution::Full => Err(DecodeStatus::Full),
    }
}

/// Reject buffers shorter than `len`
pub(crate) fn check_len(msg: &[u8], len: usize, format: &str) -> Result<(), DecodeStatus> {
    if msg.len() < len {
        log::debug!("[{format}] message too short: {} < {len}", msg.len());
        return Err(DecodeStatus::Invalid);
    }
    Ok(())
}

/// High nibble
#[inline]
pub(crate) fn hi(b: u8) -> u32 {
    (b >> 4) as u32
}

/// Low nibble
#[inline]
pub(crate) fn lo(b: u8) -> u32 {
    (b & 0x0F) as u32
}

/// Two-digit BCD byte
#[inline]
pub(crate) fn bcd(b: u8) -> u32 {
    hi(b) * 10 + lo(b)
}

/// Big-endian 16-bit word at `i`
#[inline]
pub(crate) fn be16(msg: &[u8], i: usize) -> u16 {
    ((msg[i] as u16) << 8) | msg[i + 1] as u16
}

/// Big-endian 32-bit word at `i`
#[inline]
pub(crate) fn be32(msg: &[u8], i: usize) -> u32 {
    u32::from_be_bytes([msg[i], msg[i + 1], msg[i + 2], msg[i + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::hex::hex_to_bytes;

    #[test]
    fn test_nibble_helpers() {
        assert_eq!(hi(0x9A), 9);
        assert_eq!(lo(0x9A), 10);
        assert_eq!(bcd(0x95), 95);
        assert_eq!(be16(&[0x12, 0x34], 0), 0x1234);
        assert_eq!(be32(&[0, 0x18, 0x80, 0x02, 0xC3], 1), 0x188002C3);
    }

    #[test]
    fn test_dispatch_all_zero_is_invalid() {
        let mut slots = SlotManager::new(1);
        let r = dispatch(&[0u8; 26], 0.0, &mut slots, DecoderFlags::all());
        assert_eq!(r.status, DecodeStatus::Invalid);
        assert!(!slots.get(0).unwrap().valid);
    }

    #[test]
    fn test_dispatch_respects_enabled_mask() {
        let msg = hex_to_bytes("C770359704085770000000000000000003FFFFFFFFFFFFFFFFFF");
        let mut slots = SlotManager::new(1);

        let r = dispatch(&msg, -80.0, &mut slots, DecoderFlags::B5IN1 | DecoderFlags::B6IN1);
        assert_eq!(r.status, DecodeStatus::Invalid);

        let r = dispatch(&msg, -80.0, &mut slots, DecoderFlags::LEAKAGE);
        assert_eq!(r, DecodeResult::ok(0));
    }

    #[test]
    fn test_dispatch_nothing_enabled() {
        let msg = hex_to_bytes("C770359704085770000000000000000003FFFFFFFFFFFFFFFFFF");
        let mut slots = SlotManager::new(1);
        let r = dispatch(&msg, 0.0, &mut slots, DecoderFlags::empty());
        assert_eq!(r.status, DecodeStatus::Invalid);
    }

    #[test]
    fn test_default_flags_enable_all() {
        assert!(DecoderFlags::default().contains(DecoderFlags::all()));
        assert_eq!(DecoderFlags::default().bits(), 0xFF);
    }
}
