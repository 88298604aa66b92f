//! # Bresser Lightning Decoder
//!
//! ```text
//! DIGEST:8h8h ID:8h8h CTR:12h ?4h8h KM:8d ?8h8h
//! ```
//!
//! Whitened with 0xAA like the 7-in-1 format; the digest covers
//! de-whitened bytes 2..10 with key 0xABF9 and must XOR to 0x899E.
//! The strike counter is three BCD digits and wraps at a sensor specific
//! maximum (see [`crate::counters::Lightning`]).

use crate::constants::*;
use crate::decoders::{be16, check_len, claim_slot, hi, lo, DecodeResult, DecoderFlags, MessageDecoder};
use crate::error::DecodeStatus;
use crate::integrity::lfsr_digest16;
use crate::sensor::{LightningData, Payload, SensorType, SlotManager};
use crate::util::logging::{log_integrity_result, log_message_hex};

const MIN_LEN: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct LightningDecoder;

impl LightningDecoder {
    fn try_decode(&self, msg: &[u8], rssi: f32, slots: &mut SlotManager) -> Result<usize, DecodeStatus> {
        check_len(msg, MIN_LEN, self.name())?;

        let w: Vec<u8> = msg.iter().take(MIN_LEN).map(|b| b ^ WHITENING_BYTE).collect();
        let expected = be16(&w, 0);
        let digest = lfsr_digest16(&w[2..MIN_LEN], LFSR_GENERATOR, LFSR_KEY_LIGHTNING);
        if expected ^ digest != DIGEST_XOR_LIGHTNING {
            log_integrity_result(self.name(), DIGEST_XOR_LIGHTNING, expected ^ digest);
            return Err(DecodeStatus::DigestError);
        }
        log_message_hex("De-whitened Data", &w);

        let id = be16(&w, 2) as u32;
        let slot_idx = claim_slot(slots, id)?;

        let data = LightningData {
            strike_count: (hi(w[4]) * 100 + lo(w[4]) * 10 + hi(w[5])) as u16,
            distance_km: w[7],
            unknown1: ((lo(w[5]) as u16) << 8) | w[6] as u16,
            unknown2: be16(&w, 8),
        };

        let slot = slots.get_mut(slot_idx).ok_or(DecodeStatus::Full)?;
        slot.sensor_id = id;
        slot.s_type = SensorType::from(msg[6] >> 4);
        slot.startup = msg[6] & 0x08 == 0;
        slot.chan = 0;
        slot.battery_ok = w[5] & 0x08 != 0;
        slot.rssi = rssi;
        slot.valid = true;
        slot.complete = true;
        slot.decoder = self.flag().bits();
        slot.payload = Payload::Lightning(data);

        log::debug!("[{}] {}", self.name(), slot);
        Ok(slot_idx)
    }
}

impl MessageDecoder for LightningDecoder {
    fn decode(&self, msg: &[u8], rssi: f32, slots: &mut SlotManager) -> DecodeResult {
        match self.try_decode(msg, rssi, slots) {
            Ok(idx) => DecodeResult::ok(idx),
            Err(status) => status.into(),
        }
    }

    fn name(&self) -> &'static str {
        "Lightning"
    }

    fn flag(&self) -> DecoderFlags {
        DecoderFlags::LIGHTNING
    }
}
